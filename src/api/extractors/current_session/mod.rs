/*!
 * Current session extractor
 *
 * Public API:
 * - CurrentSession
 */

mod core;
mod types;

pub use types::CurrentSession;
