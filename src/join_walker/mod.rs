//! Join planning.
//!
//! Decides which associations of a root entity or collection are fetched in the
//! same statement and how each one is joined. The result is a [`JoinPlan`] that
//! the [`crate::sql_render`] module turns into SQL.

pub mod association;
pub mod duplicate_guard;
pub mod join_type;
pub mod planner;

#[cfg(test)]
mod tests;

pub use association::{
    AssociationEdge, AssociationKey, JoinColumn, JoinPlan, JoinType, ManyToManyFragments,
    PlanRoot, RootKind, SelectShape,
};
pub use duplicate_guard::{
    DuplicateAssociationGuard, OneToManyGuard, VisitedAssociations, VisitedKeyGuard,
};
pub use join_type::{
    CollectionRootResolver, FetchLimits, JoinCandidate, JoinTypeResolver, OuterJoinResolver,
    WalkPath,
};
pub use planner::{JoinPlanner, LoadRoot, WalkStrategy};
