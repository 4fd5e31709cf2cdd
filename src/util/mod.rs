//! Small shared utilities.

mod bijection;

pub use bijection::BijectiveAssociation;
