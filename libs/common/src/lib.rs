pub mod id;
pub mod wire;

pub use wire::{
    BroadcastEvent, BroadcastRequest, DeliveryAck, NodeHeartbeat, NodeRegistration, PushEvent,
    PushRequest,
};
