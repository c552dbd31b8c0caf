mod counting;
mod local;
mod media_gate;
mod registry;
