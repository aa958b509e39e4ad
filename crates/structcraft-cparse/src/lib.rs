//! # structcraft-cparse
//!
//! Builds [`structcraft`] definitions from C headers. The headers are compiled by the external
//! [castxml](https://github.com/CastXML/CastXML) tool into an XML description of every
//! declaration, and the XML is translated into structs, unions, bitfields and enums laid out
//! the way the compiler laid them out.
//!
//! ```no_run
//! use structcraft_cparse::{ParseOptions, parse_c};
//!
//! let types = parse_c(&["include/packet.h"], &ParseOptions::default()).unwrap();
//! for (name, ty) in &types {
//!     println!("{name}: {} bytes", ty.size());
//! }
//! ```

pub mod cache;
pub mod errors;
pub mod runner;
pub mod translate;

use std::{collections::BTreeMap, fs, path::Path};

use structcraft::{ByteOrder, TypeNode};

pub use cache::XmlCache;
pub use errors::{CParseError, ExternalToolError, Unsupported};
pub use translate::translate_xml;

/// Settings for [`parse_c`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// castxml executable, looked up on `PATH` unless it is a path.
    pub castxml_cmd: String,
    /// Extra arguments placed before the inputs, e.g. include directories.
    pub extra_args: Vec<String>,
    /// Byte order of every translated definition.
    pub byteorder: ByteOrder,
    pub cache: XmlCache,
    /// Reuse an existing XML for the same inputs instead of running castxml.
    pub use_cached: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            castxml_cmd: "castxml".to_string(),
            extra_args: Vec::new(),
            byteorder: ByteOrder::Native,
            cache: XmlCache::temp(),
            use_cached: false,
        }
    }
}

/// Parses C header or source files into definitions keyed by type name.
///
/// Types that cannot be represented are logged with `tracing` at warn level and omitted.
pub fn parse_c<P: AsRef<Path>>(
    inputs: &[P],
    options: &ParseOptions,
) -> Result<BTreeMap<String, TypeNode>, CParseError> {
    let xml_path = options.cache.path_for(inputs);

    if options.use_cached && xml_path.is_file() {
        tracing::debug!(path = %xml_path.display(), "using cached castxml output");
    } else {
        runner::run_castxml(
            &options.castxml_cmd,
            &options.extra_args,
            inputs,
            &xml_path,
        )?;
    }

    let xml = fs::read_to_string(&xml_path).map_err(|source| CParseError::Io {
        path: xml_path.clone(),
        source,
    })?;
    translate_xml(&xml, options.byteorder)
}
