pub mod composite;
pub mod greedy;
pub mod hungarian;
pub mod policy;

use bevy_ecs::prelude::Resource;

pub use composite::CompositePolicy;
pub use greedy::GreedyPolicy;
pub use hungarian::HungarianPolicy;
pub use policy::{
    sort_pairs, AssignmentPolicy, Binding, CandidatePair, Feasibility, TaskCandidate,
    WorkerCandidate,
};

use crate::config::PolicyKind;

/// Resource wrapper for the assignment policy trait object.
#[derive(Resource)]
pub struct AssignmentPolicyResource(pub Box<dyn AssignmentPolicy>);

impl AssignmentPolicyResource {
    pub fn new(policy: Box<dyn AssignmentPolicy>) -> Self {
        Self(policy)
    }
}

impl std::ops::Deref for AssignmentPolicyResource {
    type Target = dyn AssignmentPolicy;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

/// Build the configured policy.
pub fn build_policy(kind: &PolicyKind) -> Box<dyn AssignmentPolicy> {
    match kind {
        PolicyKind::Greedy => Box::new(GreedyPolicy),
        PolicyKind::Composite {
            fairness_weight,
            starvation_weight,
            distance_weight,
            min_score,
        } => Box::new(CompositePolicy {
            fairness_weight: *fairness_weight,
            starvation_weight: *starvation_weight,
            distance_weight: *distance_weight,
            min_score: *min_score,
        }),
        PolicyKind::Hungarian => Box::new(HungarianPolicy),
    }
}
