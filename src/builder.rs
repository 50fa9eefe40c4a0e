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

//! The interface through which the parser materializes values.
//!
//! The parser itself never constructs a value; everything it pushes on its
//! operand stack comes out of a [`Builder`].  This keeps the parser usable
//! from any host runtime: implement the trait over your own value handles
//! and the parser stays oblivious to what they are.
//!
//! Ownership follows the signatures.  `Vec` arguments are handed over for
//! good (a failing callback is still responsible for dropping them, which
//! Rust does on its own), while `&mut` receivers stay on the parser's
//! stack.
//! An `Err` from any method aborts the parse and surfaces as
//! [`Error::Callback`](crate::Error::Callback) with the callback's error
//! inside.

use std::collections::HashSet;

use anyhow::{bail, Result};

use crate::value::Value;

pub trait Builder {
    type Value;

    fn make_null(&mut self) -> Result<Self::Value>;

    fn make_bool(&mut self, value: bool) -> Result<Self::Value>;

    fn make_int(&mut self, value: i64) -> Result<Self::Value>;

    fn make_float(&mut self, value: f64) -> Result<Self::Value>;

    /// A counted byte string (Python 2 str).
    fn make_string(&mut self, data: Vec<u8>) -> Result<Self::Value>;

    /// A counted UTF-8 string; the bytes come straight off the wire and the
    /// host decides how strictly to decode them.
    fn make_unicode(&mut self, data: Vec<u8>) -> Result<Self::Value>;

    fn make_tuple(&mut self, items: Vec<Self::Value>) -> Result<Self::Value>;

    fn make_empty_dict(&mut self) -> Result<Self::Value>;

    /// Insert `items` (alternating keys and values, wire order) into `dict`.
    /// `items.len()` is always even.  Later duplicates win.
    fn dict_setitems(&mut self, dict: &mut Self::Value, items: Vec<Self::Value>) -> Result<()>;

    /// Resolve a class reference.  Implementations must not load code on
    /// demand; look the pair up in something that already exists and fail
    /// otherwise.
    fn get_global(&mut self, module: &str, name: &str) -> Result<Self::Value>;

    /// Instantiate `class` without running any constructor.
    fn make_object(&mut self, class: Self::Value) -> Result<Self::Value>;

    /// Apply `state` (normally an attribute dict) to `object`.
    fn object_build(&mut self, object: &mut Self::Value, state: Self::Value) -> Result<()>;
}

/// The built-in [`Builder`] producing [`Value`] graphs.
///
/// Class references resolve against an explicit allow-list; nothing is ever
/// imported or executed.  The default allow-list is empty, so pickles
/// containing GLOBAL fail until the embedder registers the classes it
/// trusts.
#[derive(Debug, Clone, Default)]
pub struct ValueBuilder {
    globals: HashSet<(String, String)>,
}

impl ValueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder that resolves exactly the given (module, name) pairs.
    pub fn with_globals<I, S>(globals: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let mut builder = Self::new();
        for (module, name) in globals {
            builder.register_global(module, name);
        }
        builder
    }

    /// Allow GLOBAL to resolve `module.name`.
    pub fn register_global(&mut self, module: impl Into<String>, name: impl Into<String>) {
        self.globals.insert((module.into(), name.into()));
    }
}

impl Builder for ValueBuilder {
    type Value = Value;

    fn make_null(&mut self) -> Result<Value> {
        Ok(Value::None)
    }

    fn make_bool(&mut self, value: bool) -> Result<Value> {
        Ok(Value::Bool(value))
    }

    fn make_int(&mut self, value: i64) -> Result<Value> {
        Ok(Value::Int(value))
    }

    fn make_float(&mut self, value: f64) -> Result<Value> {
        Ok(Value::F64(value))
    }

    fn make_string(&mut self, data: Vec<u8>) -> Result<Value> {
        Ok(Value::Bytes(data))
    }

    fn make_unicode(&mut self, data: Vec<u8>) -> Result<Value> {
        match String::from_utf8(data) {
            Ok(text) => Ok(Value::String(text)),
            Err(_) => bail!("unicode payload is not valid UTF-8"),
        }
    }

    fn make_tuple(&mut self, items: Vec<Value>) -> Result<Value> {
        Ok(Value::Tuple(items))
    }

    fn make_empty_dict(&mut self) -> Result<Value> {
        Ok(Value::Dict(Vec::new()))
    }

    fn dict_setitems(&mut self, dict: &mut Value, items: Vec<Value>) -> Result<()> {
        match dict {
            Value::Dict(pairs) => {
                insert_pairs(pairs, items);
                Ok(())
            }
            other => bail!("SETITEMS target is not a dict: {:?}", other),
        }
    }

    fn get_global(&mut self, module: &str, name: &str) -> Result<Value> {
        if self.globals.contains(&(module.to_owned(), name.to_owned())) {
            Ok(Value::Class(module.to_owned(), name.to_owned()))
        } else {
            bail!("global {}.{} is not registered", module, name)
        }
    }

    fn make_object(&mut self, class: Value) -> Result<Value> {
        match class {
            Value::Class(module, name) => Ok(Value::Object {
                module,
                name,
                attrs: Vec::new(),
            }),
            other => bail!("OBJ argument is not a class reference: {:?}", other),
        }
    }

    fn object_build(&mut self, object: &mut Value, state: Value) -> Result<()> {
        let attrs = match object {
            Value::Object { attrs, .. } => attrs,
            other => bail!("BUILD target is not an instance: {:?}", other),
        };
        match state {
            Value::Dict(items) => {
                for (key, value) in items {
                    insert_pair(attrs, key, value);
                }
                Ok(())
            }
            other => bail!("instance state is not a dict: {:?}", other),
        }
    }
}

fn insert_pairs(pairs: &mut Vec<(Value, Value)>, items: Vec<Value>) {
    let mut items = items.into_iter();
    while let (Some(key), Some(value)) = (items.next(), items.next()) {
        insert_pair(pairs, key, value);
    }
}

fn insert_pair(pairs: &mut Vec<(Value, Value)>, key: Value, value: Value) {
    match pairs.iter_mut().find(|(existing, _)| *existing == key) {
        Some(entry) => entry.1 = value,
        None => pairs.push((key, value)),
    }
}
