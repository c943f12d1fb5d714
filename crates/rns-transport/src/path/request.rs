//! Path request construction, parsing and rate limiting.
//!
//! A path request is a broadcast DATA packet to the PLAIN destination
//! `rnstransport.path.request`. Its payload is the wanted destination, the
//! requester's transport id when it routes for others, and a random tag.

use std::collections::{HashMap, HashSet, VecDeque};

use rns_core::constants::TRUNCATED_HASHLENGTH;
use rns_core::destination::{name_hash, plain_destination_hash};
use rns_core::{ContextType, DestinationHash, DestinationType, PacketType, RawPacket, TruncatedHash};

use crate::constants::{MAX_PATH_REQUEST_TAGS, PATH_REQUEST_MIN_INTERVAL};

pub const PATH_REQUEST_APP: &str = "rnstransport";
pub const PATH_REQUEST_ASPECTS: [&str; 2] = ["path", "request"];

pub fn path_request_destination() -> DestinationHash {
    plain_destination_hash(&name_hash(PATH_REQUEST_APP, &PATH_REQUEST_ASPECTS))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    Processed(PathRequest),
    /// Fewer than 16 bytes.
    TooShort,
    /// A destination but no tag; such requests are ignored.
    Tagless,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRequest {
    pub destination: DestinationHash,
    pub requesting_transport_id: Option<TruncatedHash>,
    /// At most 16 bytes.
    pub tag: Vec<u8>,
}

impl PathRequest {
    /// `destination || tag`, used to ignore repeats of the same request.
    pub fn unique_tag(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + self.tag.len());
        out.extend_from_slice(self.destination.as_ref());
        out.extend_from_slice(&self.tag);
        out
    }
}

/// Parse a path request payload.
///
/// More than 32 bytes means a transport id follows the destination; tags
/// longer than 16 bytes are truncated.
#[must_use]
pub fn parse_path_request_data(data: &[u8]) -> ParseResult {
    if data.len() < TRUNCATED_HASHLENGTH {
        return ParseResult::TooShort;
    }
    let Ok(destination) = DestinationHash::try_from(&data[..TRUNCATED_HASHLENGTH]) else {
        return ParseResult::TooShort;
    };
    let rest = &data[TRUNCATED_HASHLENGTH..];
    if rest.is_empty() {
        return ParseResult::Tagless;
    }

    let (requesting_transport_id, tag) = if rest.len() > TRUNCATED_HASHLENGTH {
        let (tid, tag) = rest.split_at(TRUNCATED_HASHLENGTH);
        (TruncatedHash::try_from(tid).ok(), tag)
    } else {
        (None, rest)
    };

    ParseResult::Processed(PathRequest {
        destination,
        requesting_transport_id,
        tag: tag[..tag.len().min(TRUNCATED_HASHLENGTH)].to_vec(),
    })
}

pub fn build_path_request_data(
    target: &DestinationHash,
    transport_id: Option<&TruncatedHash>,
    tag: &[u8; 16],
) -> Vec<u8> {
    let mut data = Vec::with_capacity(48);
    data.extend_from_slice(target.as_ref());
    if let Some(tid) = transport_id {
        data.extend_from_slice(tid.as_ref());
    }
    data.extend_from_slice(tag);
    data
}

/// HEADER_1 broadcast DATA packet to the path request destination.
pub fn build_path_request(
    target: &DestinationHash,
    transport_id: Option<&TruncatedHash>,
    tag: &[u8; 16],
) -> RawPacket {
    RawPacket::new(
        PacketType::Data,
        DestinationType::Plain,
        path_request_destination(),
        ContextType::None,
        build_path_request_data(target, transport_id, tag),
    )
}

/// Outbound request pacing and inbound tag memory.
#[derive(Default)]
pub struct PathRequestTracker {
    last_request: HashMap<DestinationHash, u64>,
    seen_tags: HashSet<Vec<u8>>,
    tag_order: VecDeque<Vec<u8>>,
}

impl PathRequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a request for `dest` may go out now; records it if so.
    pub fn try_request(&mut self, dest: &DestinationHash, now: u64) -> bool {
        if let Some(&last) = self.last_request.get(dest)
            && now.saturating_sub(last) < PATH_REQUEST_MIN_INTERVAL
        {
            return false;
        }
        self.last_request.insert(*dest, now);
        true
    }

    /// Record an inbound request tag. Returns false if it was seen before.
    pub fn note_tag(&mut self, unique_tag: Vec<u8>) -> bool {
        if self.seen_tags.contains(&unique_tag) {
            return false;
        }
        self.seen_tags.insert(unique_tag.clone());
        self.tag_order.push_back(unique_tag);
        while self.tag_order.len() > MAX_PATH_REQUEST_TAGS {
            if let Some(old) = self.tag_order.pop_front() {
                self.seen_tags.remove(&old);
            }
        }
        true
    }

    /// Forget request timestamps older than the minimum interval.
    pub fn cull(&mut self, now: u64) {
        self.last_request
            .retain(|_, last| now.saturating_sub(*last) < PATH_REQUEST_MIN_INTERVAL);
    }

    pub fn clear(&mut self) {
        self.last_request.clear();
        self.seen_tags.clear();
        self.tag_order.clear();
    }
}
