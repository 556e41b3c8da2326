pub mod abi;
pub mod accounts;
pub mod artifact;
pub mod bytecode;
pub mod context;
pub mod contract;
pub mod dir;
pub mod error;
pub mod events;
pub mod gas;
pub mod ledger;
pub mod methods;
pub mod options;
pub mod transport;
pub mod types;

pub use abi::{json_to_sol_value, sol_value_to_json, Abi, FunctionInfo, ParamInfo, ParsedFunctions};
pub use accounts::{resolve_sender, AccountRef};
pub use artifact::{Artifact, ArtifactStore};
pub use bytecode::{link_bytecode, unlinked_references, Bytecode};
pub use context::{ConnectionContext, Deployment, Settings};
pub use contract::{split_options, ContractHandle};
pub use dir::ProjectRoot;
pub use error::{Error, Result};
pub use events::{ArgFilter, ArgMatch, BlockRange, DecodedEvent, ALL_EVENTS};
pub use gas::resolve_gas;
pub use ledger::{AddressLedger, AddressRecord};
pub use methods::{MethodDescriptor, MethodKind, MethodTable};
pub use options::{RawOptions, TxOptions};
pub use transport::{LogStream, Transport};
pub use types::*;
