//! End-to-end scenarios driving the whole pipeline

mod scenarios;
