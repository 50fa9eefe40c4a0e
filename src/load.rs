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

//! The streaming unpickler.
//!
//! [`Unpickler`] is a push-driven state machine: callers feed it byte
//! slices of any size, and it consumes them one byte at a time.  A byte in
//! opcode position either acts immediately or arms an accumulator (collect
//! until newline, or collect a fixed count) together with a [`Pending`]
//! continuation describing what to do with the collected bytes.  A
//! continuation may arm the next accumulator in turn (GLOBAL reads two
//! lines, counted strings read a length and then a payload), which is what
//! makes the machine resumable at any byte boundary.
//!
//! Values are materialized exclusively through the [`Builder`] the
//! unpickler was constructed with.  The operand stack owns everything the
//! builder produced; dropping the unpickler drops whatever is still on it.

use std::io::{ErrorKind, Read};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use num_traits::ToPrimitive;

use crate::builder::Builder;
use crate::consts::*;
use crate::error::{Error, ErrorCode, Result};
use crate::ieee::{detect_ieee_float, IeeeFloat};

/// Outcome of a [`Unpickler::feed`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// STOP was reached with a single value on the stack; the result is
    /// ready and any unread input was left in the caller's slice.
    Done,
    /// The input ran out mid-value; feed more bytes.
    WantMore,
}

/// What to do once the current accumulator completes.
#[derive(Debug, Clone, PartialEq)]
enum Pending {
    /// ASCII integer literal up to the newline
    Int,
    /// 4-byte signed or 2-byte unsigned little-endian integer
    BinInt,
    /// 8-byte big-endian IEEE-754 double
    BinFloat,
    /// 1- or 4-byte length prefix of a counted byte string
    StringLen,
    /// the payload of a counted byte string
    String,
    /// 4-byte length prefix of a counted UTF-8 string
    UnicodeLen,
    /// the payload of a counted UTF-8 string
    Unicode,
    /// first GLOBAL line (the module)
    GlobalModule,
    /// second GLOBAL line (the name); carries the module already read
    GlobalName(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Stage {
    /// The next byte is an opcode.
    Opcode,
    /// Collect bytes until a newline, then run the continuation.
    LineTo(Pending),
    /// Collect exactly this many bytes, then run the continuation.
    Take(usize, Pending),
}

const STACK_CAPACITY: usize = 256;
const BUF_CAPACITY: usize = 256;

/// A resumable parser for the pickle subset this codec speaks.
pub struct Unpickler<B: Builder> {
    builder: B,
    stage: Stage,
    buf: Vec<u8>,
    stack: Vec<B::Value>,
    marks: Vec<usize>,
    done: bool,
}

impl<B: Builder> Unpickler<B> {
    pub fn new(builder: B) -> Self {
        Unpickler {
            builder,
            stage: Stage::Opcode,
            buf: Vec::with_capacity(BUF_CAPACITY),
            stack: Vec::with_capacity(STACK_CAPACITY),
            marks: Vec::new(),
            done: false,
        }
    }

    /// Consume bytes from the front of `*data`, advancing the slice past
    /// everything that was used.
    ///
    /// Returns [`Status::Done`] once STOP has been seen (further calls are
    /// no-ops), [`Status::WantMore`] when the slice ran out mid-value, and
    /// an error as soon as one occurs.  After an error the unpickler is
    /// only good for dropping; the values still on its stack are released
    /// then.
    pub fn feed(&mut self, data: &mut &[u8]) -> Result<Status> {
        while !self.done {
            let (&byte, rest) = match data.split_first() {
                Some(split) => split,
                None => return Ok(Status::WantMore),
            };
            *data = rest;

            // The continuation is cleared before it runs so that it can arm
            // the next accumulator.
            match std::mem::replace(&mut self.stage, Stage::Opcode) {
                Stage::Opcode => self.dispatch(byte)?,
                Stage::LineTo(pending) => {
                    if byte == b'\n' {
                        self.complete(pending)?;
                        self.buf.clear();
                    } else {
                        self.buf.push(byte);
                        self.stage = Stage::LineTo(pending);
                    }
                }
                Stage::Take(want, pending) => {
                    self.buf.push(byte);
                    if self.buf.len() == want {
                        self.complete(pending)?;
                        self.buf.clear();
                    } else {
                        self.stage = Stage::Take(want, pending);
                    }
                }
            }
        }
        Ok(Status::Done)
    }

    /// The parsed value, once [`feed`](Self::feed) has returned
    /// [`Status::Done`].  Taking it leaves the stack empty.
    pub fn take_result(&mut self) -> Option<B::Value> {
        if self.done {
            self.stack.pop()
        } else {
            None
        }
    }

    /// Hand the builder back, dropping any values still on the stack.
    pub fn into_builder(self) -> B {
        self.builder
    }

    /// Parse a complete pickle held in memory.  Trailing bytes after STOP
    /// are ignored.
    pub fn load_from_slice(builder: B, data: &[u8]) -> Result<B::Value> {
        let mut unpickler = Unpickler::new(builder);
        let mut data = data;
        match unpickler.feed(&mut data)? {
            Status::Done => unpickler.finish(),
            Status::WantMore => Err(Error::Syntax(ErrorCode::EOFWhileParsing)),
        }
    }

    /// Parse a pickle from a reader, feeding the parser chunk by chunk.
    /// A stream that closes mid-value is an EOF error.
    pub fn load_from_reader<R: Read>(builder: B, mut reader: R) -> Result<B::Value> {
        let mut unpickler = Unpickler::new(builder);
        let mut chunk = [0u8; 8192];
        loop {
            let count = match reader.read(&mut chunk) {
                Ok(count) => count,
                Err(ref err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(Error::Io(err)),
            };
            if count == 0 {
                return Err(Error::Syntax(ErrorCode::EOFWhileParsing));
            }
            let mut data = &chunk[..count];
            if unpickler.feed(&mut data)? == Status::Done {
                return unpickler.finish();
            }
        }
    }

    fn finish(&mut self) -> Result<B::Value> {
        match self.take_result() {
            Some(value) => Ok(value),
            None => Err(Error::Syntax(ErrorCode::StackUnderflow)),
        }
    }

    fn dispatch(&mut self, opcode: u8) -> Result<()> {
        match opcode {
            STOP => {
                if self.stack.len() != 1 {
                    return Err(Error::Syntax(ErrorCode::UnfinishedParse(self.stack.len())));
                }
                self.done = true;
            }
            MARK => self.marks.push(self.stack.len()),
            NONE => {
                let value = self.builder.make_null();
                self.push(value)?;
            }
            NEWTRUE | NEWFALSE => {
                let value = self.builder.make_bool(opcode == NEWTRUE);
                self.push(value)?;
            }
            INT => self.stage = Stage::LineTo(Pending::Int),
            BININT => self.stage = Stage::Take(4, Pending::BinInt),
            BININT2 => self.stage = Stage::Take(2, Pending::BinInt),
            BINFLOAT => self.stage = Stage::Take(8, Pending::BinFloat),
            SHORT_BINSTRING => self.stage = Stage::Take(1, Pending::StringLen),
            BINSTRING => self.stage = Stage::Take(4, Pending::StringLen),
            BINUNICODE => self.stage = Stage::Take(4, Pending::UnicodeLen),
            TUPLE => {
                let items = self.pop_mark()?;
                let value = self.builder.make_tuple(items);
                self.push(value)?;
            }
            EMPTY_DICT => {
                let value = self.builder.make_empty_dict();
                self.push(value)?;
            }
            SETITEMS => self.setitems()?,
            GLOBAL => self.stage = Stage::LineTo(Pending::GlobalModule),
            OBJ => self.make_object()?,
            BUILD => self.build()?,
            other => return Err(Error::Syntax(ErrorCode::Unsupported(other))),
        }
        Ok(())
    }

    /// Run the continuation of a completed accumulator.  `self.buf` holds
    /// the collected bytes; the caller clears it afterwards.
    fn complete(&mut self, pending: Pending) -> Result<()> {
        match pending {
            Pending::Int => {
                let parsed = match parse_ascii_long(&self.buf) {
                    Some(parsed) => parsed,
                    None => {
                        return Err(Error::Syntax(ErrorCode::InvalidLiteral(self.buf.clone())))
                    }
                };
                let value = self.builder.make_int(parsed);
                self.push(value)
            }
            Pending::BinInt => {
                let parsed = read_binint(&self.buf);
                let value = self.builder.make_int(parsed);
                self.push(value)
            }
            Pending::BinFloat => match detect_ieee_float() {
                IeeeFloat::Little | IeeeFloat::Big => {
                    let parsed = BigEndian::read_f64(&self.buf);
                    let value = self.builder.make_float(parsed);
                    self.push(value)
                }
                IeeeFloat::Unsupported => Err(Error::Syntax(ErrorCode::NotIeeeFloat)),
            },
            Pending::StringLen => {
                let want = self.announced_len()?;
                if want == 0 {
                    let value = self.builder.make_string(Vec::new());
                    self.push(value)
                } else {
                    self.stage = Stage::Take(want, Pending::String);
                    Ok(())
                }
            }
            Pending::String => {
                let data = std::mem::take(&mut self.buf);
                let value = self.builder.make_string(data);
                self.push(value)
            }
            Pending::UnicodeLen => {
                let want = self.announced_len()?;
                if want == 0 {
                    let value = self.builder.make_unicode(Vec::new());
                    self.push(value)
                } else {
                    self.stage = Stage::Take(want, Pending::Unicode);
                    Ok(())
                }
            }
            Pending::Unicode => {
                let data = std::mem::take(&mut self.buf);
                let value = self.builder.make_unicode(data);
                self.push(value)
            }
            Pending::GlobalModule => {
                let module = self.buf_utf8()?;
                self.stage = Stage::LineTo(Pending::GlobalName(module));
                Ok(())
            }
            Pending::GlobalName(module) => {
                let name = self.buf_utf8()?;
                let value = self.builder.get_global(&module, &name);
                self.push(value)
            }
        }
    }

    fn push(&mut self, value: anyhow::Result<B::Value>) -> Result<()> {
        let value = value.map_err(Error::Callback)?;
        self.stack.push(value);
        Ok(())
    }

    /// Take ownership of everything pushed since the most recent MARK.
    fn pop_mark(&mut self) -> Result<Vec<B::Value>> {
        match self.marks.pop() {
            Some(depth) => Ok(self.stack.split_off(depth)),
            None => Err(Error::Syntax(ErrorCode::MissingMark)),
        }
    }

    fn setitems(&mut self) -> Result<()> {
        let items = self.pop_mark()?;
        if items.len() % 2 != 0 {
            return Err(Error::Syntax(ErrorCode::OddSetItems(items.len())));
        }
        let dict = match self.stack.last_mut() {
            Some(dict) => dict,
            None => return Err(Error::Syntax(ErrorCode::NoDictForSetItems)),
        };
        self.builder
            .dict_setitems(dict, items)
            .map_err(Error::Callback)
    }

    fn make_object(&mut self) -> Result<()> {
        let mut group = self.pop_mark()?;
        if group.len() != 1 {
            return Err(Error::Syntax(ErrorCode::BadObjectGroup(group.len())));
        }
        let class = group.remove(0);
        let value = self.builder.make_object(class);
        self.push(value)
    }

    fn build(&mut self) -> Result<()> {
        let state = match self.stack.pop() {
            Some(state) => state,
            None => return Err(Error::Syntax(ErrorCode::StackUnderflow)),
        };
        let object = match self.stack.last_mut() {
            Some(object) => object,
            None => return Err(Error::Syntax(ErrorCode::StackUnderflow)),
        };
        self.builder
            .object_build(object, state)
            .map_err(Error::Callback)
    }

    /// Decode a string length prefix: one unsigned byte, or four bytes
    /// little-endian signed with negative counts refused.
    fn announced_len(&self) -> Result<usize> {
        if self.buf.len() == 1 {
            Ok(self.buf[0] as usize)
        } else {
            match LittleEndian::read_i32(&self.buf).to_usize() {
                Some(len) => Ok(len),
                None => Err(Error::Syntax(ErrorCode::NegativeLength)),
            }
        }
    }

    fn buf_utf8(&self) -> Result<String> {
        match std::str::from_utf8(&self.buf) {
            Ok(text) => Ok(text.to_owned()),
            Err(_) => Err(Error::Syntax(ErrorCode::StringNotUtf8)),
        }
    }
}

/// Little-endian integer off the wire: 4 bytes signed (sign-extended) or 2
/// bytes unsigned.
fn read_binint(buf: &[u8]) -> i64 {
    if buf.len() == 4 {
        LittleEndian::read_i32(buf) as i64
    } else {
        LittleEndian::read_u16(buf) as i64
    }
}

/// Parse an integer literal with strtol(3) base-0 rules: optional sign,
/// `0x` hex and leading-zero octal prefixes, no trailing junk.  An empty
/// buffer parses as 0, exactly as strtol reads an empty string.
fn parse_ascii_long(buf: &[u8]) -> Option<i64> {
    if buf.is_empty() {
        return Some(0);
    }
    let text = std::str::from_utf8(buf).ok()?;
    let text = text.trim_start();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (radix, digits) = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };
    if digits.is_empty() {
        return None;
    }
    let magnitude = i128::from_str_radix(digits, radix).ok()?;
    let value = if negative { -magnitude } else { magnitude };
    value.to_i64()
}
