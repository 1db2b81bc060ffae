//! DTN endpoint identifiers and node-name extraction.
//!
//! The node speaks endpoints in two shapes: a URI string (`"dtn://node2/echo"`)
//! or a `[scheme, ssp]` pair where the scheme is either a name or a numeric
//! code (`[1, "//node2/echo"]`). The node's own encoding also sends ipn
//! endpoints as `[2, [node, service]]` and `dtn:none` as `[1, 0]`. All shapes
//! are accepted and serialized back in the shape they arrived in, so echoed
//! values are byte-for-byte what the node sent.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric scheme code for `dtn`.
pub const DTN_SCHEME_CODE: u64 = 1;
/// Numeric scheme code for `ipn`.
pub const IPN_SCHEME_CODE: u64 = 2;

/// Known URI schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Dtn,
    Ipn,
    Unknown,
}

/// Scheme component of an array-shaped endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemeTag {
    Code(u64),
    Name(String),
}

impl SchemeTag {
    pub fn scheme(&self) -> Scheme {
        match self {
            SchemeTag::Code(DTN_SCHEME_CODE) => Scheme::Dtn,
            SchemeTag::Code(IPN_SCHEME_CODE) => Scheme::Ipn,
            SchemeTag::Code(_) => Scheme::Unknown,
            SchemeTag::Name(name) => Scheme::from_name(name),
        }
    }
}

impl Scheme {
    fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("dtn") {
            Scheme::Dtn
        } else if name.eq_ignore_ascii_case("ipn") {
            Scheme::Ipn
        } else {
            Scheme::Unknown
        }
    }
}

/// An endpoint identifier as carried on the event channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Endpoint {
    /// `"dtn://node2/echo"`, `"ipn:2.1"`.
    Uri(String),
    /// `[scheme, scheme-specific part]`.
    Parts(SchemeTag, String),
    /// `[2, [node, service]]`.
    Ipn(SchemeTag, (u64, u64)),
    /// `[1, 0]` is `dtn:none`.
    DtnNone(SchemeTag, u64),
}

impl Endpoint {
    pub fn scheme(&self) -> Scheme {
        match self {
            Endpoint::Uri(uri) => match uri.split_once(':') {
                Some((scheme, _)) => Scheme::from_name(scheme),
                None => Scheme::Unknown,
            },
            Endpoint::Parts(tag, _) | Endpoint::Ipn(tag, _) | Endpoint::DtnNone(tag, _) => {
                tag.scheme()
            }
        }
    }

    /// The scheme-specific part (everything after `scheme:`).
    pub fn ssp(&self) -> Cow<'_, str> {
        match self {
            Endpoint::Uri(uri) => Cow::Borrowed(uri_ssp(uri)),
            Endpoint::Parts(_, ssp) => Cow::Borrowed(ssp.as_str()),
            Endpoint::Ipn(_, (node, service)) => Cow::Owned(format!("{node}.{service}")),
            Endpoint::DtnNone(_, 0) => Cow::Borrowed("none"),
            Endpoint::DtnNone(_, code) => Cow::Owned(code.to_string()),
        }
    }

    /// Node name used as the peer directory key.
    ///
    /// dtn: strip the leading `//` and cut at the first `/`.
    /// ipn: the node number before the `.`.
    /// Returns `None` for `dtn:none`, empty node names, and unknown schemes.
    pub fn node_name(&self) -> Option<Cow<'_, str>> {
        let ssp = match self {
            Endpoint::Uri(uri) => uri_ssp(uri),
            Endpoint::Parts(_, ssp) => ssp.as_str(),
            Endpoint::Ipn(tag, (node, _)) => {
                return (tag.scheme() == Scheme::Ipn).then(|| Cow::Owned(node.to_string()));
            }
            Endpoint::DtnNone(..) => return None,
        };
        let node = match self.scheme() {
            Scheme::Dtn => dtn_node(ssp),
            Scheme::Ipn => ipn_node(ssp),
            Scheme::Unknown => None,
        };
        node.map(Cow::Borrowed)
    }
}

fn uri_ssp(uri: &str) -> &str {
    uri.split_once(':').map(|(_, ssp)| ssp).unwrap_or(uri)
}

fn dtn_node(ssp: &str) -> Option<&str> {
    let rest = ssp.strip_prefix("//")?;
    let node = match rest.find('/') {
        Some(end) => &rest[..end],
        None => rest,
    };
    if node.is_empty() {
        None
    } else {
        Some(node)
    }
}

fn ipn_node(ssp: &str) -> Option<&str> {
    let node = match ssp.split_once('.') {
        Some((node, _)) => node,
        None => ssp,
    };
    if !node.is_empty() && node.bytes().all(|b| b.is_ascii_digit()) {
        Some(node)
    } else {
        None
    }
}

impl fmt::Display for SchemeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, self.scheme()) {
            (_, Scheme::Dtn) => f.write_str("dtn"),
            (_, Scheme::Ipn) => f.write_str("ipn"),
            (SchemeTag::Name(name), Scheme::Unknown) => f.write_str(name),
            (SchemeTag::Code(code), Scheme::Unknown) => write!(f, "{code}"),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Uri(uri) => f.write_str(uri),
            Endpoint::Parts(tag, _) | Endpoint::Ipn(tag, _) | Endpoint::DtnNone(tag, _) => {
                write!(f, "{tag}:{}", self.ssp())
            }
        }
    }
}
