pub mod alphabet;
pub mod matrix;
pub mod msa;

pub mod cli;
pub mod config;
pub mod distance;
pub mod tree;

pub mod engine;
pub mod nw_profile;
pub mod objscore;
pub mod profile;
pub mod progressive;
pub mod refine;
