//! VPC flow logs, version 2 default format

use std::fmt::Write as _;

use rand::rngs::SmallRng;
use rand::Rng;
use telegen_core::{Accumulator, GenerateError, Producer};

use crate::random;

/// Column header written at the top of every drained batch
pub const VPC_HEADER: &str =
    "version account-id interface-id srcaddr dstaddr srcport dstport protocol packets bytes start end action log-status";

static ACTIONS: &[&str] = &["ACCEPT", "REJECT"];

/// One flow record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRecord<'a> {
    pub account_id: &'a str,
    pub interface_id: &'a str,
    pub src_addr: &'a str,
    pub dst_addr: &'a str,
    pub src_port: u16,
    pub dst_port: u16,
    pub protocol: u8,
    pub packets: u32,
    pub bytes: u32,
    pub start: i64,
    pub end: i64,
    pub action: &'a str,
}

impl std::fmt::Display for FlowRecord<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "2 {} {} {} {} {} {} {} {} {} {} {} {} OK",
            self.account_id,
            self.interface_id,
            self.src_addr,
            self.dst_addr,
            self.src_port,
            self.dst_port,
            self.protocol,
            self.packets,
            self.bytes,
            self.start,
            self.end,
            self.action,
        )
    }
}

/// Emits the header on the first record after construction or a drain
pub struct VpcProducer {
    acc: Accumulator,
    rng: SmallRng,
    needs_header: bool,
    line: String,
}

impl VpcProducer {
    pub fn new(rng: SmallRng) -> Self {
        Self {
            acc: Accumulator::new(),
            rng,
            needs_header: true,
            line: String::with_capacity(256),
        }
    }
}

impl Producer for VpcProducer {
    fn generate(&mut self) -> Result<u64, GenerateError> {
        let rng = &mut self.rng;
        let interface_id = format!("eni-{}", random::hex_string(rng, 17));
        let src_addr = random::ip(rng);
        let dst_addr = random::ip(rng);
        let start = random::unix_seconds(0);
        let record = FlowRecord {
            account_id: random::account_id(rng),
            interface_id: &interface_id,
            src_addr: &src_addr,
            dst_addr: &dst_addr,
            src_port: random::port(rng),
            dst_port: random::port(rng),
            protocol: 6,
            packets: rng.random_range(1..=100),
            bytes: rng.random_range(1..=1000),
            start,
            end: start + 1,
            action: random::pick(rng, ACTIONS),
        };

        self.line.clear();
        if self.needs_header {
            self.line.push_str(VPC_HEADER);
            self.line.push('\n');
        }
        writeln!(self.line, "{record}")
            .map_err(|e| GenerateError::Producer(format!("vpc line: {e}")))?;

        self.needs_header = false;
        self.acc.write(self.line.as_bytes());
        Ok(self.acc.size())
    }

    fn drain_and_reset(&mut self) -> Vec<u8> {
        self.needs_header = true;
        self.acc.drain_and_reset()
    }
}
