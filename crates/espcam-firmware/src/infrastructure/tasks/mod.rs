pub(crate) mod network;

pub(crate) use network::{
    RadioCommandChannel, RadioLink, association_task, network_runner_task, radio_task,
};
