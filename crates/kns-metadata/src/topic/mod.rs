mod spec;
mod status;

pub use self::spec::*;
pub use self::status::*;

use crate::core::Spec;
use crate::extended::{ResourceKind, SpecExt};

impl Spec for TopicSpec {
    const LABEL: &'static str = "Topic";
    type Status = TopicStatus;

    fn same_desired(&self, other: &Self) -> bool {
        self.partitions == other.partitions
            && self.replication_factor == other.replication_factor
            && self.configs == other.configs
    }
}

impl SpecExt for TopicSpec {
    const KIND: ResourceKind = ResourceKind::Topic;
}
