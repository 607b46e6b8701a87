//! Telegen Producers - synthetic log and metric record formats
//!
//! Every producer implements [`telegen_core::Producer`]; use
//! [`producer_for`] to build one from a [`ProducerKind`].

pub mod azure;
pub mod cloudtrail;
pub mod elb;
pub mod kind;
pub mod logs;
pub mod metrics;
pub mod random;
pub mod vpc;
pub mod waf;

pub use azure::{AzureResourceLogProducer, AzureSettings};
pub use cloudtrail::CloudTrailProducer;
pub use elb::{AlbProducer, NlbProducer};
pub use kind::{producer_for, ProducerKind, ProducerSettings};
pub use logs::{LogsProducer, LogsSettings};
pub use metrics::{MetricsProducer, MetricsSettings};
pub use vpc::VpcProducer;
pub use waf::WafProducer;
