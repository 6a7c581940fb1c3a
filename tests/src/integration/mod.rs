//! Cross-node scenarios.

#[cfg(test)]
mod harness;

#[cfg(test)]
mod convergence;
#[cfg(test)]
mod durability;
#[cfg(test)]
mod propagation;
