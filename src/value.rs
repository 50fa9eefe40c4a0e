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

//! The value representation used by the built-in [`ValueBuilder`] and by the
//! serializer.  Embedders with their own value domain implement
//! [`Builder`] instead and never touch this type.
//!
//! [`Builder`]: crate::Builder
//! [`ValueBuilder`]: crate::ValueBuilder

/// An unpickled (or to-be-pickled) value.
///
/// Dicts and instance attributes are kept as pair vectors in wire order;
/// inserting an existing key overwrites its value in place.  Note the
/// serializer encodes `List` and `Tuple` identically, so a `List` comes back
/// from a round trip as a `Tuple`.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Python None
    None,
    /// Python bool
    Bool(bool),
    /// Python int (32-bit on the wire)
    Int(i64),
    /// Python float
    F64(f64),
    /// Python 2 str / byte string
    Bytes(Vec<u8>),
    /// Python unicode string
    String(String),
    /// Ordered sequence, serialized as a tuple
    List(Vec<Value>),
    /// Python tuple
    Tuple(Vec<Value>),
    /// Python dict, as ordered key/value pairs
    Dict(Vec<(Value, Value)>),
    /// A resolved class reference (module, name)
    Class(String, String),
    /// A class instance with a plain attribute dict
    Object {
        module: String,
        name: String,
        attrs: Vec<(Value, Value)>,
    },
}
