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

use std::error;
use std::fmt;
use std::io;
use std::result;

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorCode {
    /// Unsupported or unknown opcode
    Unsupported(u8),
    /// Stream ended in the middle of a value
    EOFWhileParsing,
    /// Pop on an empty operand stack
    StackUnderflow,
    /// STOP reached with this many values on the stack instead of one
    UnfinishedParse(usize),
    /// A group-consuming opcode found no open MARK
    MissingMark,
    /// Counted string with a negative length prefix
    NegativeLength,
    /// Decimal integer literal that strtol would reject
    InvalidLiteral(Vec<u8>),
    /// SETITEMS over a run with an unpaired key
    OddSetItems(usize),
    /// SETITEMS with nothing beneath the MARK to insert into
    NoDictForSetItems,
    /// OBJ expects exactly one value (the class) above the MARK
    BadObjectGroup(usize),
    /// GLOBAL module or name is not UTF-8
    StringNotUtf8,
    /// Value graph nested deeper than the configured limit
    Recursive,
    /// Value kind the serializer refuses to encode
    Unpicklable(&'static str),
    /// Host floating point format is not 8-byte IEEE-754
    NotIeeeFloat,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ErrorCode::Unsupported(op) => write!(fmt, "unsupported opcode 0x{:02x}", op),
            ErrorCode::EOFWhileParsing => write!(fmt, "EOF while parsing"),
            ErrorCode::StackUnderflow => write!(fmt, "pickle stack underflow"),
            ErrorCode::UnfinishedParse(n) => {
                write!(fmt, "STOP with {} values on the stack", n)
            }
            ErrorCode::MissingMark => write!(fmt, "no MARK on the stack"),
            ErrorCode::NegativeLength => write!(fmt, "negative length prefix"),
            ErrorCode::InvalidLiteral(ref l) => {
                write!(fmt, "invalid integer literal: {}", String::from_utf8_lossy(l))
            }
            ErrorCode::OddSetItems(n) => {
                write!(fmt, "SETITEMS with odd number of items ({})", n)
            }
            ErrorCode::NoDictForSetItems => write!(fmt, "SETITEMS with no dictionary beneath"),
            ErrorCode::BadObjectGroup(n) => {
                write!(fmt, "OBJ with {} values above the MARK, expected 1", n)
            }
            ErrorCode::StringNotUtf8 => write!(fmt, "string is not UTF-8 encoded"),
            ErrorCode::Recursive => write!(fmt, "structure nested too deeply"),
            ErrorCode::Unpicklable(what) => write!(fmt, "cannot pickle {}", what),
            ErrorCode::NotIeeeFloat => {
                write!(fmt, "host floating point format is not IEEE-754")
            }
        }
    }
}

/// This type represents all possible errors that can occur when serializing
/// or deserializing a value.
#[derive(Debug)]
pub enum Error {
    /// Some IO error occurred when serializing or deserializing a value.
    Io(io::Error),
    /// The byte stream violated the pickle subset this codec speaks.
    Syntax(ErrorCode),
    /// A host callback refused to materialize a value; carries the
    /// callback's own error.
    Callback(anyhow::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref err) => write!(fmt, "i/o error: {}", err),
            Error::Syntax(ref code) => write!(fmt, "invalid pickle: {}", code),
            Error::Callback(ref err) => write!(fmt, "host callback failed: {}", err),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            Error::Syntax(_) => None,
            Error::Callback(ref err) => Some(err.as_ref()),
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Error {
        Error::Io(error)
    }
}

pub type Result<T> = result::Result<T, Error>;
