// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod command;
pub mod grid_engine;
pub mod slurm;
pub mod processor;
pub mod shutdown;

pub use command::{CommandRunner, TokioCommandRunner};
pub use grid_engine::GridEngineScheduler;
pub use processor::ScriptChunkProcessor;
pub use slurm::SlurmScheduler;
