//! Packet context byte.

/// Purpose of a packet's payload. Unknown values are carried through
/// unchanged so relays never reject traffic from newer peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextType {
    None,
    Resource,
    ResourceAdv,
    ResourceReq,
    ResourceHmu,
    ResourceProof,
    ResourceInitiatorCancel,
    ResourceReceiverCancel,
    CacheRequest,
    Request,
    Response,
    PathResponse,
    Command,
    CommandStatus,
    Channel,
    Keepalive,
    LinkIdentify,
    LinkClose,
    LinkProof,
    Lrrtt,
    Lrproof,
    Other(u8),
}

impl ContextType {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => Self::None,
            1 => Self::Resource,
            2 => Self::ResourceAdv,
            3 => Self::ResourceReq,
            4 => Self::ResourceHmu,
            5 => Self::ResourceProof,
            6 => Self::ResourceInitiatorCancel,
            7 => Self::ResourceReceiverCancel,
            8 => Self::CacheRequest,
            9 => Self::Request,
            10 => Self::Response,
            11 => Self::PathResponse,
            12 => Self::Command,
            13 => Self::CommandStatus,
            14 => Self::Channel,
            250 => Self::Keepalive,
            251 => Self::LinkIdentify,
            252 => Self::LinkClose,
            253 => Self::LinkProof,
            254 => Self::Lrrtt,
            255 => Self::Lrproof,
            other => Self::Other(other),
        }
    }

    pub const fn to_byte(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Resource => 1,
            Self::ResourceAdv => 2,
            Self::ResourceReq => 3,
            Self::ResourceHmu => 4,
            Self::ResourceProof => 5,
            Self::ResourceInitiatorCancel => 6,
            Self::ResourceReceiverCancel => 7,
            Self::CacheRequest => 8,
            Self::Request => 9,
            Self::Response => 10,
            Self::PathResponse => 11,
            Self::Command => 12,
            Self::CommandStatus => 13,
            Self::Channel => 14,
            Self::Keepalive => 250,
            Self::LinkIdentify => 251,
            Self::LinkClose => 252,
            Self::LinkProof => 253,
            Self::Lrrtt => 254,
            Self::Lrproof => 255,
            Self::Other(byte) => byte,
        }
    }
}
