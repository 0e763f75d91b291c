pub(crate) mod answers;
pub(crate) mod countdown;
pub(crate) mod runner;


pub(crate) use runner::{run_session, AttemptSession, SessionCommand, SessionError, SessionSignal};
