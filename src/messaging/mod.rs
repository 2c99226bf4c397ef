// Messaging - Lock-free queues between the UI thread and the audio callback

pub mod channels;
pub mod command;
pub mod notification;
