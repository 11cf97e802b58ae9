mod alignment;
mod refinement;
mod trees;
