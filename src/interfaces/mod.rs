pub mod subgen;

pub use subgen::{generate, write_subscription, Collaborators};
