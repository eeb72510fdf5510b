//! Who is acting. The engine never authenticates: callers resolve the
//! current participant and pass it as `actor`.

use crate::Participant;

pub trait IdentityProvider {
    /// The signed-in participant, if any.
    fn current_participant(&self) -> Option<Participant>;
}

/// A fixed identity, e.g. taken from a CLI flag.
#[derive(Clone, Debug, Default)]
pub struct StaticIdentity(Option<Participant>);

impl StaticIdentity {
    pub fn new(participant: Option<Participant>) -> Self {
        Self(participant)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_participant(&self) -> Option<Participant> {
        self.0.clone()
    }
}
