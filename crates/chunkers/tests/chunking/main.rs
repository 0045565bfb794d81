/// Integration tests for the segmenters driven through the default registry:
/// structural invariants for every format, end-to-end scenarios, and
/// concurrent registry use with cancellation.

mod helpers;
mod properties;
mod registry;
mod scenarios;
