//! Start, stop, reboot and back up cloud resources on schedules kept in
//! resource tags.
//!
//! Two stateless stages share this library. The find stage
//! (`offhours-find`) runs once per 10-minute cycle: it scans every catalog
//! entry, matches `sched-*` tag schedules against the cycle instant, and
//! queues one operation request per matching resource. The do stage
//! (`offhours-do`) consumes the queue and invokes the provider API,
//! routing unrecoverable failures to a dead-letter channel.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod constants;
pub mod doer;
pub mod errors;
pub mod finder;
pub mod naming;
pub mod provider;
pub mod queue;
pub mod sched;
