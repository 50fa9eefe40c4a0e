//
// Copyright (C) 2023 SpinorML.
//
// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at

//   http://www.apache.org/licenses/LICENSE-2.0

// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! A safe, restricted codec for Python's pickle format.
//!
//! `brine` speaks a deliberately small subset of pickle protocols 0–2:
//! None, bools, 32-bit ints, floats, byte strings, unicode strings,
//! tuples, dicts, and class instances resolved against an explicit
//! allow-list.  Nothing in a pickle can make it import a module or call a
//! constructor, and every opcode outside the subset is rejected outright.
//!
//! Parsing is incremental: [`Unpickler::feed`] accepts input in chunks of
//! any size, so the codec sits comfortably behind a socket or any other
//! stream that arrives in pieces.  Values are built through the
//! [`Builder`] trait, which hosts can implement over their own value
//! representation; the built-in [`ValueBuilder`] produces [`Value`]
//! graphs.
//!
//! Something to get you started:
//!
//! ```rust
//! use brine::{value_from_slice, value_to_vec, Value};
//!
//! let value = Value::Tuple(vec![Value::Int(1), Value::String("two".into())]);
//! let data = value_to_vec(&value).unwrap();
//! assert_eq!(value_from_slice(&data).unwrap(), value);
//! ```
//!
//! The serializer encodes lists and tuples identically, so a `List` comes
//! back from a round trip as a `Tuple`.

use std::io::{Read, Write};

/// The host interface for materializing values, and the built-in
/// implementation of it.
pub mod builder;

/// Constants for the supported pickle opcodes.
pub mod consts;

/// The pickler: emitter primitives and the value-visit driver.
pub mod dump;

/// Error and result types.
pub mod error;

/// Detection of the host floating point format.
pub mod ieee;

/// The streaming unpickler.
pub mod load;

/// The built-in value representation.
pub mod value;

pub use crate::builder::{Builder, ValueBuilder};
pub use crate::dump::{Pickler, PicklerOptions, BATCH_SIZE};
pub use crate::error::{Error, ErrorCode, Result};
pub use crate::ieee::{detect_ieee_float, IeeeFloat};
pub use crate::load::{Status, Unpickler};
pub use crate::value::Value;

/// Parse a pickle held in memory into a [`Value`].
///
/// Uses a [`ValueBuilder`] with an empty allow-list, so pickles containing
/// GLOBAL fail; construct an [`Unpickler`] with your own builder to permit
/// specific classes.
pub fn value_from_slice(data: &[u8]) -> Result<Value> {
    Unpickler::load_from_slice(ValueBuilder::new(), data)
}

/// Parse a pickle from a reader into a [`Value`].
pub fn value_from_reader<R: Read>(reader: R) -> Result<Value> {
    Unpickler::load_from_reader(ValueBuilder::new(), reader)
}

/// Serialize a [`Value`] into a byte vector.
pub fn value_to_vec(value: &Value) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    Pickler::new(&mut data).dump(value)?;
    Ok(data)
}

/// Serialize a [`Value`] to a writer.
pub fn value_to_writer<W: Write>(writer: W, value: &Value) -> Result<()> {
    Pickler::new(writer).dump(value)
}
