//! Parse `.env` files and merge them, together with JSON config files and
//! Vault secrets, into an environment.
//!
//! The parser ([`parse_env`]) is pure: it expands `$VAR`/`${VAR}` references,
//! strips trailing comments and surrounding quotes, and decodes backslash
//! escapes, returning an ordered mapping. [`EnvLoader`] writes such mappings
//! into a [`TargetEnv`] without replacing keys that are already set, and reads
//! values back through [`coerce`].
//!
//! [`EnvLoader::new`] targets an in-memory snapshot of the process
//! environment. Convenience loaders (`dotenv`, `from_path`, `from_paths`)
//! mutate the process environment and are `unsafe`, because callers must
//! guarantee no concurrent process-environment access.

mod args;
mod coerce;
mod env;
mod error;
mod escape;
mod expand;
mod loader;
mod model;
mod parser;
mod resolver;
mod strip;
mod vault;

pub use args::{ArgOverrides, parse_param_string, scan_args};
pub use coerce::{MAX_SAFE_INTEGER, NativeValue, coerce, is_numeric};
pub use env::TargetEnv;
pub use error::Error;
pub use escape::decode;
pub use expand::{Expander, ProcessEnv, UNSET_SENTINEL, VarSource, expand};
pub use loader::{DEFAULT_HELPERS, DEFAULT_MODE_KEY, EnvLoader, dotenv, from_path, from_paths};
pub use model::{
    Encoding, EnvMapping, ErrorPolicy, FileContent, LoadReport, MissingVarPolicy, ParseOptions,
    ResolvedFile, SubstitutionMode,
};
pub use parser::{parse_bytes, parse_env, parse_reader, parse_str};
pub use resolver::{DEFAULT_FILES, FileResolver, expand_home};
pub use strip::{strip_comment, strip_comment_and_quotes, strip_quotes};
pub use vault::{DEFAULT_TIMEOUT, TOKEN_FILE, VaultOptions, fetch_secret, secret_url};
