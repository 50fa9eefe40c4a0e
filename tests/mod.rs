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

use std::cell::Cell;
use std::io::Read;
use std::rc::Rc;

use quickcheck::{Arbitrary, Gen};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use brine::consts::SETITEMS;
use brine::{
    value_from_reader, value_from_slice, value_to_vec, Builder, Error, ErrorCode, Status,
    Unpickler, Value, ValueBuilder, BATCH_SIZE,
};

macro_rules! pyobj {
    (n=None)     => { Value::None };
    (b=True)     => { Value::Bool(true) };
    (b=False)    => { Value::Bool(false) };
    (i=$i:expr)  => { Value::Int($i) };
    (f=$f:expr)  => { Value::F64($f) };
    (bb=$b:expr) => { Value::Bytes($b.to_vec()) };
    (s=$s:expr)  => { Value::String($s.into()) };
    (t=($($m:ident=$v:tt),*))  => { Value::Tuple(vec![$(pyobj!($m=$v)),*]) };
    (l=[$($m:ident=$v:tt),*])  => { Value::List(vec![$(pyobj!($m=$v)),*]) };
    (d={$($km:ident=$kv:tt => $vm:ident=$vv:tt),*}) => {
        Value::Dict(vec![$((pyobj!($km=$kv), pyobj!($vm=$vv))),*])
    };
}

/// What a value looks like after one round trip: lists come back as
/// tuples, everything else is unchanged.
fn coerced(value: Value) -> Value {
    match value {
        Value::List(items) | Value::Tuple(items) => {
            Value::Tuple(items.into_iter().map(coerced).collect())
        }
        Value::Dict(pairs) => Value::Dict(
            pairs
                .into_iter()
                .map(|(k, v)| (coerced(k), coerced(v)))
                .collect(),
        ),
        Value::Object {
            module,
            name,
            attrs,
        } => Value::Object {
            module,
            name,
            attrs: attrs
                .into_iter()
                .map(|(k, v)| (coerced(k), coerced(v)))
                .collect(),
        },
        other => other,
    }
}

fn test_object() -> Value {
    pyobj!(d={
        n=None           => n=None,
        b=False          => t=(b=False, b=True),
        i=10             => i=100000,
        f=1.0            => f=1.0,
        bb=b"bytes"      => bb=b"bytes",
        s="string"       => s="string",
        t=(i=1, i=2)     => t=(i=1, i=2, i=3),
        t=()             => l=[
            l=[i=1, i=2, i=3],
            d={},
            bb=b"\x00\x55\xaa\xff"
        ]
    })
}

#[test]
fn roundtrip_supported_kinds() {
    let obj = test_object();
    let data = value_to_vec(&obj).unwrap();
    assert_eq!(value_from_slice(&data).unwrap(), coerced(obj));
}

#[test]
fn roundtrip_scalars() {
    for obj in [
        pyobj!(n = None),
        pyobj!(b = True),
        pyobj!(b = False),
        pyobj!(i = 0),
        pyobj!(i = -1),
        pyobj!(i = 65535),
        pyobj!(i = (i32::MIN as i64)),
        pyobj!(i = (i32::MAX as i64)),
        pyobj!(f = 0.0),
        pyobj!(f = -2.5),
        pyobj!(f = f64::INFINITY),
        pyobj!(bb = b""),
        pyobj!(s = ""),
        pyobj!(s = "snake \u{1f40d}"),
    ] {
        let data = value_to_vec(&obj).unwrap();
        assert_eq!(value_from_slice(&data).unwrap(), obj, "{:?}", obj);
    }
}

#[test]
fn roundtrip_long_byte_string() {
    let obj = Value::Bytes(vec![0xab; 70_000]);
    let data = value_to_vec(&obj).unwrap();
    assert_eq!(value_from_slice(&data).unwrap(), obj);
}

#[test]
fn parses_python_binfloat_bytes() {
    // pickle.dumps(1.5, 1) from CPython
    assert_eq!(
        value_from_slice(b"G\x3f\xf8\x00\x00\x00\x00\x00\x00.").unwrap(),
        Value::F64(1.5)
    );
}

#[test]
fn instance_roundtrip_with_registered_global() {
    let obj = Value::Object {
        module: "M".into(),
        name: "C".into(),
        attrs: vec![(Value::Bytes(b"x".to_vec()), Value::Int(7))],
    };
    let data = value_to_vec(&obj).unwrap();
    assert_eq!(data, b"(cM\nC\no}(U\x01xJ\x07\x00\x00\x00ub.");

    let builder = ValueBuilder::with_globals(vec![("M", "C")]);
    assert_eq!(Unpickler::load_from_slice(builder, &data).unwrap(), obj);
}

#[test]
fn default_builder_refuses_globals() {
    let obj = Value::Class("M".into(), "C".into());
    let data = value_to_vec(&obj).unwrap();
    match value_from_slice(&data) {
        Err(Error::Callback(err)) => {
            assert!(err.to_string().contains("not registered"), "{}", err)
        }
        other => panic!("expected Callback error, got {:?}", other),
    }
}

#[test]
fn dict_batching_splits_and_roundtrips() {
    let pairs: Vec<(Value, Value)> = (0..2500i64)
        .map(|i| (Value::Int(i % 65536), Value::Int(-i)))
        .collect();
    let obj = Value::Dict(pairs);
    let data = value_to_vec(&obj).unwrap();

    let groups = data.iter().filter(|&&b| b == SETITEMS).count();
    assert_eq!(groups, 2500 / BATCH_SIZE + 1);
    assert_eq!(value_from_slice(&data).unwrap(), obj);
}

#[test]
fn recursion_limit_is_deterministic() {
    let mut obj = Value::None;
    for _ in 0..1100 {
        obj = Value::Tuple(vec![obj]);
    }
    match value_to_vec(&obj) {
        Err(Error::Syntax(ErrorCode::Recursive)) => {}
        other => panic!("expected Recursive, got {:?}", other),
    }
}

// -- Chunked feeding ---------------------------------------------------

#[test]
fn one_byte_at_a_time_matches_whole_slice() {
    let obj = test_object();
    let data = value_to_vec(&obj).unwrap();

    let mut unpickler = Unpickler::new(ValueBuilder::new());
    let mut status = Status::WantMore;
    for byte in &data {
        let mut chunk = std::slice::from_ref(byte);
        status = unpickler.feed(&mut chunk).unwrap();
    }
    assert_eq!(status, Status::Done);
    assert_eq!(unpickler.take_result().unwrap(), coerced(obj));
}

fn load_in_random_chunks(data: &[u8], seed: u64) -> brine::Result<Value> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut unpickler = Unpickler::new(ValueBuilder::with_globals(vec![("m", "C")]));
    let mut rest = data;
    while !rest.is_empty() {
        let take = rng.gen_range(1..=rest.len().min(5));
        let (mut chunk, tail) = rest.split_at(take);
        rest = tail;
        if unpickler.feed(&mut chunk)? == Status::Done {
            break;
        }
    }
    match unpickler.take_result() {
        Some(value) => Ok(value),
        None => Err(Error::Syntax(ErrorCode::EOFWhileParsing)),
    }
}

#[test]
fn random_chunk_boundaries_match_whole_slice() {
    let obj = test_object();
    let data = value_to_vec(&obj).unwrap();
    let expected = value_from_slice(&data).unwrap();
    for seed in 0..32 {
        assert_eq!(load_in_random_chunks(&data, seed).unwrap(), expected);
    }
}

// -- Reader-driven loading ---------------------------------------------

/// Hands out one byte per read call, forcing the parser to resume on
/// every byte boundary.
struct OneByteReader<'a> {
    data: &'a [u8],
}

impl<'a> Read for OneByteReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match (self.data.split_first(), buf.first_mut()) {
            (Some((&byte, rest)), Some(slot)) => {
                *slot = byte;
                self.data = rest;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

#[test]
fn loads_from_a_dribbling_reader() {
    let obj = test_object();
    let data = value_to_vec(&obj).unwrap();
    let value = value_from_reader(OneByteReader { data: &data }).unwrap();
    assert_eq!(value, coerced(obj));
}

#[test]
fn truncated_stream_is_an_eof_error() {
    let data = value_to_vec(&test_object()).unwrap();
    let truncated = &data[..data.len() - 1];
    match value_from_reader(OneByteReader { data: truncated }) {
        Err(Error::Syntax(ErrorCode::EOFWhileParsing)) => {}
        other => panic!("expected EOFWhileParsing, got {:?}", other),
    }
}

// -- Ownership of intermediate values ----------------------------------

/// A value that keeps a live count, so tests can observe exactly when the
/// parser releases what it created.
struct Token {
    live: Rc<Cell<i64>>,
    children: Vec<Token>,
}

impl Token {
    fn new(live: &Rc<Cell<i64>>) -> Token {
        live.set(live.get() + 1);
        Token {
            live: Rc::clone(live),
            children: Vec::new(),
        }
    }
}

impl Drop for Token {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

struct CountingBuilder {
    live: Rc<Cell<i64>>,
}

impl CountingBuilder {
    fn new() -> (Self, Rc<Cell<i64>>) {
        let live = Rc::new(Cell::new(0));
        (
            CountingBuilder {
                live: Rc::clone(&live),
            },
            live,
        )
    }
}

impl Builder for CountingBuilder {
    type Value = Token;

    fn make_null(&mut self) -> anyhow::Result<Token> {
        Ok(Token::new(&self.live))
    }

    fn make_bool(&mut self, _value: bool) -> anyhow::Result<Token> {
        Ok(Token::new(&self.live))
    }

    fn make_int(&mut self, _value: i64) -> anyhow::Result<Token> {
        Ok(Token::new(&self.live))
    }

    fn make_float(&mut self, _value: f64) -> anyhow::Result<Token> {
        Ok(Token::new(&self.live))
    }

    fn make_string(&mut self, _data: Vec<u8>) -> anyhow::Result<Token> {
        Ok(Token::new(&self.live))
    }

    fn make_unicode(&mut self, _data: Vec<u8>) -> anyhow::Result<Token> {
        Ok(Token::new(&self.live))
    }

    fn make_tuple(&mut self, items: Vec<Token>) -> anyhow::Result<Token> {
        let mut token = Token::new(&self.live);
        token.children = items;
        Ok(token)
    }

    fn make_empty_dict(&mut self) -> anyhow::Result<Token> {
        Ok(Token::new(&self.live))
    }

    fn dict_setitems(&mut self, dict: &mut Token, items: Vec<Token>) -> anyhow::Result<()> {
        dict.children.extend(items);
        Ok(())
    }

    fn get_global(&mut self, _module: &str, _name: &str) -> anyhow::Result<Token> {
        Ok(Token::new(&self.live))
    }

    fn make_object(&mut self, class: Token) -> anyhow::Result<Token> {
        let mut token = Token::new(&self.live);
        token.children.push(class);
        Ok(token)
    }

    fn object_build(&mut self, object: &mut Token, state: Token) -> anyhow::Result<()> {
        object.children.push(state);
        Ok(())
    }
}

#[test]
fn dropping_mid_stream_releases_everything() {
    let (builder, live) = CountingBuilder::new();
    let mut unpickler = Unpickler::new(builder);
    let mut data: &[u8] = b"(NNN";
    assert_eq!(unpickler.feed(&mut data).unwrap(), Status::WantMore);
    assert_eq!(live.get(), 3);
    drop(unpickler);
    assert_eq!(live.get(), 0);
}

#[test]
fn an_error_still_releases_everything() {
    let (builder, live) = CountingBuilder::new();
    let mut unpickler = Unpickler::new(builder);
    let mut data: &[u8] = b"}(NNNu.";
    match unpickler.feed(&mut data) {
        Err(Error::Syntax(ErrorCode::OddSetItems(3))) => {}
        other => panic!("expected OddSetItems, got {:?}", other),
    }
    drop(unpickler);
    assert_eq!(live.get(), 0);
}

#[test]
fn taking_the_result_transfers_ownership() {
    let (builder, live) = CountingBuilder::new();
    let mut unpickler = Unpickler::new(builder);
    let mut data: &[u8] = b"(N\x88t.";
    assert_eq!(unpickler.feed(&mut data).unwrap(), Status::Done);
    assert_eq!(live.get(), 3);

    let result = unpickler.take_result().unwrap();
    drop(unpickler);
    assert_eq!(live.get(), 3, "result must keep its children alive");
    drop(result);
    assert_eq!(live.get(), 0);
}

#[test]
fn a_foreign_opcode_releases_pushed_values() {
    let (builder, live) = CountingBuilder::new();
    let mut unpickler = Unpickler::new(builder);
    let mut data: &[u8] = b"NN\xffQ";
    match unpickler.feed(&mut data) {
        Err(Error::Syntax(ErrorCode::Unsupported(0xff))) => {}
        other => panic!("expected Unsupported, got {:?}", other),
    }
    assert_eq!(live.get(), 2);
    drop(unpickler);
    assert_eq!(live.get(), 0);
}

#[test]
fn fresh_parser_releases_nothing() {
    let (builder, live) = CountingBuilder::new();
    let unpickler = Unpickler::new(builder);
    drop(unpickler);
    assert_eq!(live.get(), 0);
}

// -- Property tests ----------------------------------------------------

const GEN_DEPTH: u32 = 2;

#[derive(Clone, Debug)]
struct ArbValue(Value);

impl Arbitrary for ArbValue {
    fn arbitrary(g: &mut Gen) -> Self {
        ArbValue(gen_value(g, GEN_DEPTH))
    }
}

fn gen_value(g: &mut Gen, depth: u32) -> Value {
    let upper = if depth > 0 { 10 } else { 6 };
    match gen_range(g, upper) {
        // leaves
        0 => Value::None,
        1 => Value::Bool(bool::arbitrary(g)),
        2 => Value::Int(i32::arbitrary(g) as i64),
        3 => Value::F64(gen_float(g)),
        4 => Value::Bytes(Vec::arbitrary(g)),
        5 => Value::String(String::arbitrary(g)),
        // recursive variants
        6 => Value::Tuple(gen_vec(g, depth - 1)),
        7 => Value::List(gen_vec(g, depth - 1)),
        8 => Value::Dict(gen_pairs(g, depth - 1)),
        9 => Value::Object {
            module: "m".into(),
            name: "C".into(),
            attrs: gen_pairs(g, depth - 1),
        },
        _ => unreachable!(),
    }
}

fn gen_float(g: &mut Gen) -> f64 {
    let value = f64::arbitrary(g);
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

fn gen_key(g: &mut Gen) -> Value {
    match gen_range(g, 5) {
        0 => Value::None,
        1 => Value::Bool(bool::arbitrary(g)),
        2 => Value::Int(i32::arbitrary(g) as i64),
        3 => Value::Bytes(Vec::arbitrary(g)),
        4 => Value::String(String::arbitrary(g)),
        _ => unreachable!(),
    }
}

fn gen_vec(g: &mut Gen, depth: u32) -> Vec<Value> {
    (0..gen_range(g, 8)).map(|_| gen_value(g, depth)).collect()
}

// Keys are deduplicated the same way dict insertion does it, so a
// generated dict always round-trips to itself.
fn gen_pairs(g: &mut Gen, depth: u32) -> Vec<(Value, Value)> {
    let mut pairs: Vec<(Value, Value)> = Vec::new();
    for _ in 0..gen_range(g, 8) {
        let key = gen_key(g);
        let value = gen_value(g, depth);
        match pairs.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => pairs.push((key, value)),
        }
    }
    pairs
}

fn gen_range(g: &mut Gen, upper: usize) -> usize {
    let choices: Vec<usize> = (0..upper).collect();
    *g.choose(&choices).unwrap()
}

#[test]
fn qc_roundtrip() {
    fn prop(value: ArbValue) -> bool {
        let data = value_to_vec(&value.0).unwrap();
        let builder = ValueBuilder::with_globals(vec![("m", "C")]);
        Unpickler::load_from_slice(builder, &data).unwrap() == coerced(value.0)
    }
    quickcheck::quickcheck(prop as fn(ArbValue) -> bool);
}

#[test]
fn qc_chunk_invariance() {
    fn prop(value: ArbValue, seed: u64) -> bool {
        let data = value_to_vec(&value.0).unwrap();
        let whole = {
            let builder = ValueBuilder::with_globals(vec![("m", "C")]);
            Unpickler::load_from_slice(builder, &data).unwrap()
        };
        load_in_random_chunks(&data, seed).unwrap() == whole
    }
    quickcheck::quickcheck(prop as fn(ArbValue, u64) -> bool);
}
