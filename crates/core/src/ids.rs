// SPDX-License-Identifier: MIT

//! Concrete id newtypes minted via [`crate::define_id!`].

crate::define_id! {
    /// Identifies a run session: a single submission of a spec to one or
    /// more agents.
    pub struct RunId("run");
}

crate::define_id! {
    /// Identifies a single agent invocation within a run.
    pub struct AgentInvocationId("agt");
}

crate::define_id! {
    /// Identifies a competition review session over a set of agent invocations.
    pub struct ReviewId("rev");
}

crate::define_id! {
    /// Identifies a saved spec descriptor in the `specs` session domain.
    pub struct SpecId("spc");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;

    #[test]
    fn run_id_carries_prefix() {
        let clock = FakeClock::new();
        let id = RunId::new(&clock);
        assert!(id.as_str().starts_with("run-"));
    }

    #[test]
    fn agent_invocation_id_carries_prefix() {
        let clock = FakeClock::new();
        let id = AgentInvocationId::new(&clock);
        assert!(id.as_str().starts_with("agt-"));
    }

    #[test]
    fn review_id_carries_prefix() {
        let clock = FakeClock::new();
        let id = ReviewId::new(&clock);
        assert!(id.as_str().starts_with("rev-"));
    }

    #[test]
    fn spec_id_carries_prefix() {
        let clock = FakeClock::new();
        let id = SpecId::new(&clock);
        assert!(id.as_str().starts_with("spc-"));
    }

    #[test]
    fn distinct_id_types_do_not_compare_equal_by_construction() {
        let clock = FakeClock::new();
        clock.set_epoch_ms(7);
        let run = RunId::from_string("run-7-aaaaaaaa");
        let agent = AgentInvocationId::from_string("agt-7-aaaaaaaa");
        assert_ne!(run.as_str(), agent.as_str());
    }
}
