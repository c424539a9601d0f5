/*!
 * Monitoring
 * Tracing subscriber setup for binaries embedding the runtime
 */

mod tracer;

pub use tracer::init_tracing;
