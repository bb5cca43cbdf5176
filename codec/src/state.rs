//! Connection-scoped decoder state.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use bitstream::Bits;
use schema::{ClassSchema, SchemaCatalog};

use crate::bootstrap::bootstrap_class;

/// The object bound to an open channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub class: Arc<ClassSchema>,
    pub instance_name: String,
}

/// State accumulated across the packets of one connection.
///
/// Holds the open channels, per-class instance counters, classes resolved so
/// far (placeholders for unknown ids included) and the bootstrap bits carried
/// between payloads. Packets must be fed in arrival order.
pub struct ParserState {
    catalog: Box<dyn SchemaCatalog + Send + Sync>,
    classes: HashMap<u32, Arc<ClassSchema>>,
    placeholders: usize,
    bootstrap: Arc<ClassSchema>,
    channels: BTreeMap<u16, Channel>,
    instance_counts: HashMap<String, u32>,
    bits_carried_over: Bits,
}

impl ParserState {
    /// Creates an empty state backed by `catalog`.
    pub fn new(catalog: impl SchemaCatalog + Send + Sync + 'static) -> Self {
        Self {
            catalog: Box::new(catalog),
            classes: HashMap::new(),
            placeholders: 0,
            bootstrap: Arc::new(bootstrap_class()),
            channels: BTreeMap::new(),
            instance_counts: HashMap::new(),
            bits_carried_over: Bits::new(),
        }
    }

    /// Returns the class for a wire class id.
    ///
    /// Ids the catalog does not know get an empty placeholder class named
    /// `unknown<N>`, where `N` counts the placeholders registered so far in
    /// this state. Catalog classes are not counted, since a catalog is only
    /// queried by id, so the first placeholder is always `unknown0` whatever
    /// the catalog size.
    pub fn resolve_class(&mut self, class_id: u32) -> Arc<ClassSchema> {
        if let Some(class) = self.classes.get(&class_id) {
            return Arc::clone(class);
        }
        let class = Arc::new(self.catalog.lookup(class_id).unwrap_or_else(|| {
            let name = format!("unknown{}", self.placeholders);
            self.placeholders += 1;
            tracing::debug!(class_id, %name, "registered placeholder class");
            ClassSchema::new(name)
        }));
        self.classes.insert(class_id, Arc::clone(&class));
        class
    }

    /// The class of the bootstrap object.
    #[must_use]
    pub fn bootstrap_class(&self) -> Arc<ClassSchema> {
        Arc::clone(&self.bootstrap)
    }

    /// Binds a new object of `class` to `channel` and returns its instance name.
    pub fn open_channel(&mut self, channel: u16, class: Arc<ClassSchema>) -> String {
        let counter = self.instance_counts.entry(class.name.clone()).or_insert(0);
        let instance_name = format!("{}_{counter}", class.name);
        *counter += 1;
        tracing::debug!(channel, instance = %instance_name, "opened channel");
        self.channels.insert(
            channel,
            Channel {
                class,
                instance_name: instance_name.clone(),
            },
        );
        instance_name
    }

    /// Removes the object bound to `channel`.
    pub fn close_channel(&mut self, channel: u16) -> Option<Channel> {
        let closed = self.channels.remove(&channel);
        if let Some(closed) = &closed {
            tracing::debug!(channel, instance = %closed.instance_name, "closed channel");
        }
        closed
    }

    #[must_use]
    pub fn channel(&self, channel: u16) -> Option<&Channel> {
        self.channels.get(&channel)
    }

    /// Open channels in channel order.
    pub fn channels(&self) -> impl Iterator<Item = (u16, &Channel)> + '_ {
        self.channels.iter().map(|(id, channel)| (*id, channel))
    }

    /// Number of instances of `class_name` created so far.
    #[must_use]
    pub fn instance_count(&self, class_name: &str) -> u32 {
        self.instance_counts.get(class_name).copied().unwrap_or(0)
    }

    #[must_use]
    pub const fn placeholder_count(&self) -> usize {
        self.placeholders
    }

    /// Bootstrap bits waiting for the next bootstrap payload.
    #[must_use]
    pub const fn bits_carried_over(&self) -> &Bits {
        &self.bits_carried_over
    }

    pub(crate) fn take_carried_over(&mut self) -> Bits {
        std::mem::take(&mut self.bits_carried_over)
    }

    pub(crate) fn set_carried_over(&mut self, bits: Bits) {
        self.bits_carried_over = bits;
    }
}

impl fmt::Debug for ParserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserState")
            .field("classes", &self.classes.len())
            .field("placeholders", &self.placeholders)
            .field("channels", &self.channels)
            .field("instance_counts", &self.instance_counts)
            .field("bits_carried_over", &self.bits_carried_over)
            .finish_non_exhaustive()
    }
}
