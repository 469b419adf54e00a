//! Everything that touches the operating system.
//!
//! - [`poller`]: `poll(2)` wrapper over the network descriptor and the interrupt wake pipe
//! - [`socket`]: the [`Transport`](socket::Transport) trait and descriptor setup
//! - [`demux`]: classification of inbound datagrams by magic number
//! - [`interrupt`]: operator interrupt (SIGINT, SIGTSTP) handling through a self-pipe

pub mod demux;
pub(crate) mod interrupt;
pub(crate) mod poller;
pub mod socket;
