//! Cross-module tests of the ECS core
//!
//! Unit tests live next to each module; these exercise the registry, the
//! component stores, the scheduler and the scene loader together.

mod scenarios;
