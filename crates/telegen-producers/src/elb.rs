//! Elastic Load Balancing access logs: ALB and NLB text formats

use std::fmt::Write as _;

use rand::rngs::SmallRng;
use rand::Rng;
use telegen_core::{Accumulator, GenerateError, Producer};

use crate::random::{self, pick};

pub struct AlbProducer {
    acc: Accumulator,
    rng: SmallRng,
    line: String,
}

impl AlbProducer {
    pub fn new(rng: SmallRng) -> Self {
        Self {
            acc: Accumulator::new(),
            rng,
            line: String::with_capacity(512),
        }
    }
}

/// One ALB access log line, 30 space-separated fields
fn write_alb_line(rng: &mut SmallRng, out: &mut String) -> std::fmt::Result {
    let account = random::account_id(rng);
    let now = random::iso8601_now();
    let region = random::region(rng);

    write!(
        out,
        "{kind} {now} app/my-alb/{account} {cip}:{cport} {tip}:{tport} {req:.3} {target:.3} {resp:.3} \
         {elb_status} {target_status} {received} {sent} \"{method} {scheme}://{domain}:80{path} HTTP/1.1\" \
         \"{agent}\" {cipher} {proto} arn:aws:elasticloadbalancing:{region}:{account}:targetgroup/tg/{tg} \
         \"Root=1-{trace_a}-{trace_b}\" \"{domain}\" \"-\" 0 {now} \"forward\" \"-\" \"-\" \
         \"{tip}:{tport}\" \"200\" \"-\" \"-\" {request_id}",
        kind = pick(rng, random::HTTP_SCHEMES),
        cip = random::ip(rng),
        cport = random::port(rng),
        tip = random::ip(rng),
        tport = random::port(rng),
        req = random::processing_time(rng),
        target = random::processing_time(rng),
        resp = random::processing_time(rng),
        elb_status = pick(rng, random::STATUSES),
        target_status = pick(rng, random::STATUSES),
        received = random::bytes_size(rng),
        sent = random::bytes_size(rng),
        method = pick(rng, random::HTTP_METHODS),
        scheme = pick(rng, random::HTTP_SCHEMES),
        domain = pick(rng, random::DOMAINS),
        path = pick(rng, random::URI_PATHS),
        agent = pick(rng, random::USER_AGENTS),
        cipher = pick(rng, random::SSL_CIPHERS),
        proto = pick(rng, random::TLS_PROTOCOLS),
        tg = random::hex_string(rng, 16),
        trace_a = random::hex_string(rng, 8),
        trace_b = random::hex_string(rng, 24),
        request_id = random::upper_alnum_string(rng, 5),
    )?;
    out.push('\n');
    Ok(())
}

impl Producer for AlbProducer {
    fn generate(&mut self) -> Result<u64, GenerateError> {
        self.line.clear();
        write_alb_line(&mut self.rng, &mut self.line)
            .map_err(|e| GenerateError::Producer(format!("alb line: {e}")))?;
        self.acc.write(self.line.as_bytes());
        Ok(self.acc.size())
    }

    fn drain_and_reset(&mut self) -> Vec<u8> {
        self.acc.drain_and_reset()
    }
}

pub struct NlbProducer {
    acc: Accumulator,
    rng: SmallRng,
    line: String,
}

impl NlbProducer {
    pub fn new(rng: SmallRng) -> Self {
        Self {
            acc: Accumulator::new(),
            rng,
            line: String::with_capacity(384),
        }
    }
}

/// One NLB TLS access log line, 22 space-separated fields
fn write_nlb_line(rng: &mut SmallRng, out: &mut String) -> std::fmt::Result {
    let now = random::iso8601_now();
    let region = random::region(rng);
    let account = random::account_id(rng);
    let listener = random::hex_string(rng, 16);

    write!(
        out,
        "tls 2.0 {now} net/my-nlb/{lb} {listener} {cip}:{cport} {dip}:{dport} {conn_ms} {hs_ms} \
         {received} {sent} - arn:aws:acm:{region}:{account}:certificate/{cert} - {cipher} {proto} - \
         {domain} - - - {now}",
        lb = random::hex_string(rng, 16),
        cip = random::ip(rng),
        cport = random::port(rng),
        dip = random::ip(rng),
        dport = random::port(rng),
        conn_ms = rng.random_range(0..1000),
        hs_ms = rng.random_range(0..1000),
        received = random::bytes_size(rng),
        sent = random::bytes_size(rng),
        cert = random::uuid(rng),
        cipher = pick(rng, random::SSL_CIPHERS),
        proto = pick(rng, random::TLS_PROTOCOLS),
        domain = pick(rng, random::DOMAINS),
    )?;
    out.push('\n');
    Ok(())
}

impl Producer for NlbProducer {
    fn generate(&mut self) -> Result<u64, GenerateError> {
        self.line.clear();
        write_nlb_line(&mut self.rng, &mut self.line)
            .map_err(|e| GenerateError::Producer(format!("nlb line: {e}")))?;
        self.acc.write(self.line.as_bytes());
        Ok(self.acc.size())
    }

    fn drain_and_reset(&mut self) -> Vec<u8> {
        self.acc.drain_and_reset()
    }
}
