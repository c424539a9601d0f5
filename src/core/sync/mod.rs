/*!
 * Synchronization Primitives
 *
 * The counting gate the main thread parks on until shutdown.
 */

mod gate;

pub use gate::ShutdownGate;
