//! Closed label vocabulary for the resolver metrics.
//!
//! Every label value exported by this crate comes from one of the enums
//! below, keeping time-series cardinality bounded by the vocabulary instead
//! of by traffic. New label values must be added here.

/// Which resolution subsystem handled a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum System {
    Auth,
    Cache,
    Recursive,
    Reverse,
    Stub,
}

impl System {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            System::Auth => "auth",
            System::Cache => "cache",
            System::Recursive => "recursive",
            System::Reverse => "reverse",
            System::Stub => "stub",
        }
    }
}

/// Classified failure outcome of a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cause {
    Nxdomain,
    Nodata,
    Truncated,
    Refused,
    Overflow,
    Loop,
    Servfail,
}

impl Cause {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Cause::Nxdomain => "nxdomain",
            Cause::Nodata => "nodata",
            Cause::Truncated => "truncated",
            Cause::Refused => "refused",
            Cause::Overflow => "overflow",
            Cause::Loop => "loop",
            Cause::Servfail => "servfail",
        }
    }

    /// Maps a response code to the error cause it counts under, or `None`
    /// for codes that are not counted at all.
    ///
    /// Nodata is not observable from the response code alone (NOERROR with
    /// an empty answer section) and is left unclassified here.
    #[must_use]
    pub fn from_rcode(rcode: Rcode) -> Option<Cause> {
        match rcode {
            Rcode::SERVFAIL => Some(Cause::Servfail),
            Rcode::REFUSED => Some(Cause::Refused),
            Rcode::NXDOMAIN => Some(Cause::Nxdomain),
            _ => None,
        }
    }
}

/// Which cache layer missed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheType {
    Response,
    Signature,
}

impl CacheType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            CacheType::Response => "response",
            CacheType::Signature => "signature",
        }
    }
}

/// DNS response code (RCODE) as carried on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rcode(pub u16);

impl Rcode {
    pub const NOERROR: Rcode = Rcode(0);
    pub const FORMERR: Rcode = Rcode(1);
    pub const SERVFAIL: Rcode = Rcode(2);
    pub const NXDOMAIN: Rcode = Rcode(3);
    pub const NOTIMP: Rcode = Rcode(4);
    pub const REFUSED: Rcode = Rcode(5);
}

/// The slice of a DNS response the recorder needs: status code and encoded
/// message size. Handlers that produced no response pass `None` instead.
#[derive(Clone, Copy, Debug)]
pub struct ResponseStat {
    pub rcode: Rcode,
    /// Encoded message length in bytes.
    pub wire_len: usize,
}
