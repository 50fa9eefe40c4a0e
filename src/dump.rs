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

//! The pickler: a byte emitter with one primitive per wire token, and a
//! visit driver that walks a [`Value`] and calls them in the right order.
//!
//! The emitter primitives are public so that embedders serializing their
//! own value domain can drive them directly, the same way [`dump`] drives
//! them for [`Value`].
//!
//! [`dump`]: Pickler::dump

use std::io::Write;

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use num_traits::ToPrimitive;

use crate::consts::*;
use crate::error::{Error, ErrorCode, Result};
use crate::ieee::{detect_ieee_float, IeeeFloat};
use crate::value::Value;

/// Dict entries are emitted in MARK..SETITEMS groups of at most this many
/// pairs, bounding the unpickler's peak operand stack.
pub const BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone)]
pub struct PicklerOptions {
    /// How deeply values may nest before the pickler gives up.
    pub max_depth: usize,
}

impl Default for PicklerOptions {
    fn default() -> Self {
        Self { max_depth: 1000 }
    }
}

/// Serializes values into pickle bytes readable by Python's own pickle.
pub struct Pickler<W: Write> {
    writer: W,
    options: PicklerOptions,
    depth: usize,
}

impl<W: Write> Pickler<W> {
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, PicklerOptions::default())
    }

    pub fn with_options(writer: W, options: PicklerOptions) -> Self {
        Pickler {
            writer,
            options,
            depth: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Serialize one complete value, STOP included.
    pub fn dump(&mut self, value: &Value) -> Result<()> {
        self.save(value)?;
        self.save_stop()
    }

    fn save(&mut self, value: &Value) -> Result<()> {
        if self.depth == self.options.max_depth {
            return Err(Error::Syntax(ErrorCode::Recursive));
        }
        self.depth += 1;
        let result = self.save_value(value);
        self.depth -= 1;
        result
    }

    fn save_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::None => self.save_null(),
            Value::Bool(v) => self.save_bool(*v),
            Value::Int(v) => self.save_int(*v),
            Value::F64(v) => self.save_float(*v),
            Value::Bytes(data) => self.save_string(data),
            Value::String(text) => self.save_utf8(text),
            // Lists and tuples are indistinguishable on the wire; both come
            // back from a round trip as tuples.
            Value::List(items) | Value::Tuple(items) => {
                self.save_mark()?;
                for item in items {
                    self.save(item)?;
                }
                self.save_tuple()
            }
            Value::Dict(pairs) => self.save_dict(pairs),
            Value::Class(module, name) => self.save_global(module, name),
            Value::Object {
                module,
                name,
                attrs,
            } => {
                self.save_mark()?;
                self.save_global(module, name)?;
                self.save_obj()?;
                self.save_dict(attrs)?;
                self.save_build()
            }
        }
    }

    fn save_dict(&mut self, pairs: &[(Value, Value)]) -> Result<()> {
        self.save_empty_dict()?;
        for batch in pairs.chunks(BATCH_SIZE) {
            self.save_mark()?;
            for (key, value) in batch {
                self.save(key)?;
                self.save(value)?;
            }
            self.save_setitems()?;
        }
        Ok(())
    }

    // Emitter primitives.  Each writes one wire token and nothing else.

    pub fn save_stop(&mut self) -> Result<()> {
        self.put(STOP)
    }

    pub fn save_mark(&mut self) -> Result<()> {
        self.put(MARK)
    }

    pub fn save_null(&mut self) -> Result<()> {
        self.put(NONE)
    }

    pub fn save_bool(&mut self, value: bool) -> Result<()> {
        self.put(if value { NEWTRUE } else { NEWFALSE })
    }

    /// BININT: the value as four little-endian bytes.  Values that need
    /// more than 32 bits are refused rather than truncated.
    pub fn save_int(&mut self, value: i64) -> Result<()> {
        match value.to_i32() {
            Some(value) => {
                self.put(BININT)?;
                self.writer.write_i32::<LittleEndian>(value)?;
                Ok(())
            }
            None => Err(Error::Syntax(ErrorCode::Unpicklable(
                "integer beyond 32-bit range",
            ))),
        }
    }

    /// BINFLOAT: eight big-endian IEEE-754 bytes, refused on non-IEEE
    /// hosts.
    pub fn save_float(&mut self, value: f64) -> Result<()> {
        match detect_ieee_float() {
            IeeeFloat::Little | IeeeFloat::Big => {
                self.put(BINFLOAT)?;
                self.writer.write_f64::<BigEndian>(value)?;
                Ok(())
            }
            IeeeFloat::Unsupported => Err(Error::Syntax(ErrorCode::NotIeeeFloat)),
        }
    }

    /// SHORT_BINSTRING below 256 bytes, BINSTRING up to 2**31-1.
    pub fn save_string(&mut self, data: &[u8]) -> Result<()> {
        if data.len() < 256 {
            self.put(SHORT_BINSTRING)?;
            self.writer.write_u8(data.len() as u8)?;
        } else {
            match data.len().to_i32() {
                Some(len) => {
                    self.put(BINSTRING)?;
                    self.writer.write_i32::<LittleEndian>(len)?;
                }
                None => {
                    return Err(Error::Syntax(ErrorCode::Unpicklable(
                        "byte string longer than 2**31-1",
                    )))
                }
            }
        }
        self.writer.write_all(data)?;
        Ok(())
    }

    /// BINUNICODE: counted UTF-8 bytes.
    pub fn save_utf8(&mut self, text: &str) -> Result<()> {
        let data = text.as_bytes();
        match data.len().to_i32() {
            Some(len) => {
                self.put(BINUNICODE)?;
                self.writer.write_u32::<LittleEndian>(len as u32)?;
                self.writer.write_all(data)?;
                Ok(())
            }
            None => Err(Error::Syntax(ErrorCode::Unpicklable(
                "text longer than 2**31-1 encoded bytes",
            ))),
        }
    }

    pub fn save_tuple(&mut self) -> Result<()> {
        self.put(TUPLE)
    }

    pub fn save_empty_dict(&mut self) -> Result<()> {
        self.put(EMPTY_DICT)
    }

    pub fn save_setitems(&mut self) -> Result<()> {
        self.put(SETITEMS)
    }

    /// GLOBAL: module and name, each newline-terminated.  Newlines inside
    /// either would corrupt the stream, so they are refused.
    pub fn save_global(&mut self, module: &str, name: &str) -> Result<()> {
        if module.contains('\n') || name.contains('\n') {
            return Err(Error::Syntax(ErrorCode::Unpicklable(
                "global name containing a newline",
            )));
        }
        self.put(GLOBAL)?;
        self.writer.write_all(module.as_bytes())?;
        self.writer.write_u8(b'\n')?;
        self.writer.write_all(name.as_bytes())?;
        self.writer.write_u8(b'\n')?;
        Ok(())
    }

    pub fn save_obj(&mut self) -> Result<()> {
        self.put(OBJ)
    }

    pub fn save_build(&mut self) -> Result<()> {
        self.put(BUILD)
    }

    fn put(&mut self, opcode: u8) -> Result<()> {
        self.writer.write_u8(opcode)?;
        Ok(())
    }
}
