mod flow;
mod frame;
mod liveness;
