mod spec;
mod status;

pub use self::spec::*;
pub use self::status::*;

use crate::core::Spec;
use crate::extended::{ResourceKind, SpecExt};

impl Spec for ConnectorSpec {
    const LABEL: &'static str = "Connector";
    type Status = ConnectorStatus;

    fn same_desired(&self, other: &Self) -> bool {
        self.connect_cluster == other.connect_cluster && self.config == other.config
    }
}

impl SpecExt for ConnectorSpec {
    const KIND: ResourceKind = ResourceKind::Connector;
}
