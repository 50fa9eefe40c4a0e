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

//! Runtime classification of the host floating point format.
//!
//! The binary float opcode carries 8-byte big-endian IEEE-754 doubles, so
//! both directions of the codec refuse to touch floats on hosts that do not
//! store doubles as IEEE-754.

use once_cell::sync::OnceCell;

/// How this process stores an `f64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IeeeFloat {
    /// 8-byte IEEE-754, least significant byte first
    Little,
    /// 8-byte IEEE-754, most significant byte first
    Big,
    /// Anything else; floats cannot be encoded or decoded
    Unsupported,
}

// A double whose IEEE-754 image has eight distinct bytes, so the two byte
// orders cannot be confused.
const PROBE: f64 = 19210354409446948.0;
const LITTLE: [u8; 8] = [0x89, 0x67, 0xa5, 0xcb, 0xed, 0x0f, 0x51, 0x43];
const BIG: [u8; 8] = [0x43, 0x51, 0x0f, 0xed, 0xcb, 0xa5, 0x67, 0x89];

static DETECTED: OnceCell<IeeeFloat> = OnceCell::new();

/// Classify the host float format, memoized for the life of the process.
pub fn detect_ieee_float() -> IeeeFloat {
    *DETECTED.get_or_init(|| match PROBE.to_ne_bytes() {
        LITTLE => IeeeFloat::Little,
        BIG => IeeeFloat::Big,
        _ => IeeeFloat::Unsupported,
    })
}
