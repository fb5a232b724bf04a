//! Metric registry and the recorder surface the resolver calls into.
//!
//! One `Metrics` instance owns every aggregation for the life of the
//! process. The resolver shares it behind an `Arc` and records through the
//! `record_*` methods; the exposition server reads it through [`Metrics::gather`].

use std::time::Instant;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::config::Config;
use crate::error::Result;
use crate::labels::{CacheType, Cause, ResponseStat, System};

const REQUEST_COUNT: &str = "dns_request_count";
const REQUEST_DURATION: &str = "dns_request_duration";
const RESPONSE_SIZE: &str = "dns_response_size";
const ERROR_COUNT: &str = "dns_error_count";
const CACHE_MISS_COUNT: &str = "dns_cache_miss_count";

/// Sub-10ms resolution at the low end, then the standard exponential tail.
fn duration_buckets() -> Vec<f64> {
    let mut buckets = vec![0.001, 0.003];
    buckets.extend_from_slice(prometheus::DEFAULT_BUCKETS);
    buckets
}

/// Typical DNS message sizes: fine steps through common UDP payloads,
/// 4k increments after 4096 up to the 64KiB TCP/EDNS ceiling.
fn size_buckets() -> Vec<f64> {
    vec![
        0.0, 512.0, 1024.0, 1500.0, 2048.0, 4096.0, 8192.0, 12288.0, 16384.0, 20480.0, 24576.0,
        28672.0, 32768.0, 36864.0, 40960.0, 45056.0, 49152.0, 53248.0, 57344.0, 61440.0, 65536.0,
    ]
}

pub struct Metrics {
    registry: Registry,
    request_count: IntCounterVec,
    request_duration: HistogramVec,
    response_size: HistogramVec,
    error_count: IntCounterVec,
    cache_miss: IntCounterVec,
}

impl Metrics {
    /// Builds all five metric families on a fresh registry.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_registry(Registry::new(), config)
    }

    /// Builds the metric families and registers them with `registry`.
    /// Fails if any name collides with a family already registered there;
    /// that means two instances were initialized against the same registry,
    /// which is a process misconfiguration.
    pub fn with_registry(registry: Registry, config: &Config) -> Result<Self> {
        let opts = |name: &str, help: &str| {
            Opts::new(name, help)
                .namespace(config.namespace.clone())
                .subsystem(config.subsystem.clone())
        };
        let hist_opts = |name: &str, help: &str, buckets: Vec<f64>| {
            HistogramOpts::new(name, help)
                .namespace(config.namespace.clone())
                .subsystem(config.subsystem.clone())
                .buckets(buckets)
        };

        let request_count = IntCounterVec::new(
            opts(REQUEST_COUNT, "Counter of DNS requests made."),
            &["system"],
        )?;
        let request_duration = HistogramVec::new(
            hist_opts(
                REQUEST_DURATION,
                "Histogram of the time (in seconds) each request took to resolve.",
                duration_buckets(),
            ),
            &["system"],
        )?;
        let response_size = HistogramVec::new(
            hist_opts(
                RESPONSE_SIZE,
                "Size of the returned response in bytes.",
                size_buckets(),
            ),
            &["system"],
        )?;
        let error_count = IntCounterVec::new(
            opts(ERROR_COUNT, "Counter of DNS requests resulting in an error."),
            &["system", "cause"],
        )?;
        let cache_miss = IntCounterVec::new(
            opts(
                CACHE_MISS_COUNT,
                "Counter of DNS requests that result in a cache miss.",
            ),
            &["cache"],
        )?;

        registry.register(Box::new(request_count.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(response_size.clone()))?;
        registry.register(Box::new(error_count.clone()))?;
        registry.register(Box::new(cache_miss.clone()))?;

        Ok(Self {
            registry,
            request_count,
            request_duration,
            response_size,
            error_count,
            cache_miss,
        })
    }

    /// Counts a request at dispatch time.
    pub fn record_request(&self, system: System) {
        self.request_count
            .with_label_values(&[system.as_str()])
            .inc();
    }

    /// Observes the wall-clock duration since `start` and the response size.
    /// Call exactly once per request, after the terminal outcome is known;
    /// `None` means no response was produced and counts as zero bytes.
    pub fn record_completion(&self, resp: Option<ResponseStat>, start: Instant, system: System) {
        let wire_len = resp.map_or(0.0, |r| r.wire_len as f64);
        self.request_duration
            .with_label_values(&[system.as_str()])
            .observe(start.elapsed().as_secs_f64());
        self.response_size
            .with_label_values(&[system.as_str()])
            .observe(wire_len);
    }

    /// Counts a failed outcome under its classified cause. No-op when there
    /// is no response to classify or when the response code carries no
    /// counted cause.
    pub fn record_error(&self, resp: Option<ResponseStat>, system: System) {
        let Some(resp) = resp else { return };
        if let Some(cause) = Cause::from_rcode(resp.rcode) {
            self.error_count
                .with_label_values(&[system.as_str(), cause.as_str()])
                .inc();
        }
    }

    /// Counts a cache lookup miss. Hits are not recorded; miss rate is the
    /// signal operators watch.
    pub fn record_cache_miss(&self, cache: CacheType) {
        self.cache_miss.with_label_values(&[cache.as_str()]).inc();
    }

    /// Current snapshot of every registered family.
    #[must_use]
    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }

    /// Text exposition of the current snapshot, for in-process consumers
    /// when no listener is running.
    #[must_use]
    pub fn export_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&self.gather(), &mut buf).is_err() {
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::labels::Rcode;

    fn metrics() -> Metrics {
        Metrics::new(&Config::default()).unwrap()
    }

    #[test]
    fn request_count_tracks_only_its_system() {
        let m = metrics();
        for _ in 0..3 {
            m.record_request(System::Auth);
        }
        assert_eq!(m.request_count.with_label_values(&["auth"]).get(), 3);
        assert_eq!(m.request_count.with_label_values(&["cache"]).get(), 0);
        assert_eq!(m.request_count.with_label_values(&["recursive"]).get(), 0);
    }

    #[test]
    fn completion_observes_size_and_duration() {
        let m = metrics();
        let resp = ResponseStat {
            rcode: Rcode::NOERROR,
            wire_len: 512,
        };
        m.record_completion(Some(resp), Instant::now(), System::Stub);

        let size = m.response_size.with_label_values(&["stub"]);
        assert_eq!(size.get_sample_count(), 1);
        assert_eq!(size.get_sample_sum(), 512.0);

        let duration = m.request_duration.with_label_values(&["stub"]);
        assert_eq!(duration.get_sample_count(), 1);
    }

    #[test]
    fn absent_response_counts_as_zero_bytes() {
        let m = metrics();
        m.record_completion(None, Instant::now(), System::Reverse);

        let size = m.response_size.with_label_values(&["reverse"]);
        assert_eq!(size.get_sample_count(), 1);
        assert_eq!(size.get_sample_sum(), 0.0);
    }

    #[test]
    fn errors_count_under_their_cause() {
        let m = metrics();
        let servfail = ResponseStat {
            rcode: Rcode::SERVFAIL,
            wire_len: 0,
        };
        m.record_error(Some(servfail), System::Recursive);

        let hit = m.error_count.with_label_values(&["recursive", "servfail"]);
        assert_eq!(hit.get(), 1);
        for cause in ["nxdomain", "nodata", "truncated", "refused", "overflow", "loop"] {
            assert_eq!(
                m.error_count.with_label_values(&["recursive", cause]).get(),
                0
            );
        }
    }

    #[test]
    fn unclassified_and_absent_responses_count_nothing() {
        let m = metrics();
        let notimp = ResponseStat {
            rcode: Rcode::NOTIMP,
            wire_len: 0,
        };
        m.record_error(Some(notimp), System::Auth);
        m.record_error(None, System::Auth);
        for cause in ["nxdomain", "refused", "servfail"] {
            assert_eq!(m.error_count.with_label_values(&["auth", cause]).get(), 0);
        }
    }

    #[test]
    fn cache_miss_counters_are_independent() {
        let m = metrics();
        m.record_cache_miss(CacheType::Response);
        m.record_cache_miss(CacheType::Response);
        m.record_cache_miss(CacheType::Signature);
        assert_eq!(m.cache_miss.with_label_values(&["response"]).get(), 2);
        assert_eq!(m.cache_miss.with_label_values(&["signature"]).get(), 1);
    }

    #[test]
    fn concurrent_increments_do_not_lose_updates() {
        let m = Arc::new(metrics());
        let threads: u64 = 8;
        let per_thread: u64 = 1000;
        thread::scope(|s| {
            for _ in 0..threads {
                let m = Arc::clone(&m);
                s.spawn(move || {
                    for _ in 0..per_thread {
                        m.record_request(System::Cache);
                    }
                });
            }
        });
        assert_eq!(
            m.request_count.with_label_values(&["cache"]).get(),
            threads * per_thread
        );
    }

    #[test]
    fn names_carry_namespace_and_subsystem() {
        let config = Config {
            namespace: "skydns".into(),
            ..Config::default()
        };
        let m = Metrics::new(&config).unwrap();
        m.record_request(System::Auth);
        let text = m.export_text();
        assert!(text.contains("skydns_dnsd_dns_request_count"));
    }

    #[test]
    fn duplicate_registration_is_surfaced() {
        let registry = Registry::new();
        let clash = prometheus::IntCounter::new("dnsd_dns_request_count", "clash").unwrap();
        registry.register(Box::new(clash)).unwrap();
        assert!(Metrics::with_registry(registry, &Config::default()).is_err());
    }
}
