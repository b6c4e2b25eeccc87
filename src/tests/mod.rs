// Tests module
// Bootstrap: filesystem, keys, genesis and context produced by `testnode::new`
// Chain: block production, transactions and restart of a bootstrapped node

pub mod bootstrap;
pub mod chain;
