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

//! Constants for the pickle opcodes this codec speaks.
//!
//! The names are the ones Python's pickle.py uses.  Only the opcodes below
//! are recognized; every other byte in opcode position is rejected by the
//! parser.

pub const MARK            : u8 = b'(';    // push special markobject on stack
pub const STOP            : u8 = b'.';    // every pickle ends with STOP
pub const INT             : u8 = b'I';    // push integer; decimal string argument
pub const BININT          : u8 = b'J';    // push four-byte signed int
pub const BININT2         : u8 = b'M';    // push 2-byte unsigned int
pub const NONE            : u8 = b'N';    // push None
pub const BINSTRING       : u8 = b'T';    // push string; counted binary string argument
pub const SHORT_BINSTRING : u8 = b'U';    //  "     "   ;    "      "       "      " < 256 bytes
pub const BINUNICODE      : u8 = b'X';    // push Unicode string; counted UTF-8 string argument
pub const BUILD           : u8 = b'b';    // call __setstate__ or __dict__.update()
pub const GLOBAL          : u8 = b'c';    // push self.find_class(modname, name); 2 string args
pub const EMPTY_DICT      : u8 = b'}';    // push empty dict
pub const OBJ             : u8 = b'o';    // build & push class instance
pub const TUPLE           : u8 = b't';    // build tuple from topmost stack items
pub const SETITEMS        : u8 = b'u';    // modify dict by adding topmost key+value pairs
pub const BINFLOAT        : u8 = b'G';    // push float; arg is 8-byte big-endian encoding
pub const NEWTRUE         : u8 = b'\x88'; // push True
pub const NEWFALSE        : u8 = b'\x89'; // push False

// Ops deliberately left unrecognized, so that pickles relying on them fail
// loudly instead of being half-understood.  Memo ops would require keeping
// shared references alive, REDUCE/NEWOBJ/INST call arbitrary constructors,
// and the LONG family needs big integers.
// pub const POP          : u8 = b'0';    // discard topmost stack item
// pub const POP_MARK     : u8 = b'1';    // discard stack top through topmost markobject
// pub const DUP          : u8 = b'2';    // duplicate top stack item
// pub const FLOAT        : u8 = b'F';    // push float object; decimal string argument
// pub const BININT1      : u8 = b'K';    // push 1-byte unsigned int
// pub const LONG         : u8 = b'L';    // push long; decimal string argument
// pub const PERSID       : u8 = b'P';    // push persistent object; id is taken from string arg
// pub const BINPERSID    : u8 = b'Q';    //  "       "         "  ;  "  "   "     "  stack
// pub const REDUCE       : u8 = b'R';    // apply callable to argtuple, both on stack
// pub const STRING       : u8 = b'S';    // push string; NL-terminated string argument
// pub const UNICODE      : u8 = b'V';    // push Unicode string; raw-unicode-escaped'd argument
// pub const APPEND       : u8 = b'a';    // append stack top to list below it
// pub const DICT         : u8 = b'd';    // build a dict from stack items
// pub const APPENDS      : u8 = b'e';    // extend list on stack by topmost stack slice
// pub const GET          : u8 = b'g';    // push item from memo on stack; index is string arg
// pub const BINGET       : u8 = b'h';    //  "    "    "    "   "   "  ;   "    " 1-byte arg
// pub const INST         : u8 = b'i';    // build & push class instance
// pub const LONG_BINGET  : u8 = b'j';    // push item from memo on stack; index is 4-byte arg
// pub const LIST         : u8 = b'l';    // build list from topmost stack items
// pub const EMPTY_LIST   : u8 = b']';    // push empty list
// pub const PUT          : u8 = b'p';    // store stack top in memo; index is string arg
// pub const BINPUT       : u8 = b'q';    //   "     "    "   "   " ;   "    " 1-byte arg
// pub const LONG_BINPUT  : u8 = b'r';    //   "     "    "   "   " ;   "    " 4-byte arg
// pub const SETITEM      : u8 = b's';    // add key+value pair to dict
// pub const EMPTY_TUPLE  : u8 = b')';    // push empty tuple
// pub const PROTO        : u8 = b'\x80'; // identify pickle protocol
// pub const NEWOBJ       : u8 = b'\x81'; // build object by applying cls.__new__ to argtuple
// pub const TUPLE1       : u8 = b'\x85'; // build 1-tuple from stack top
// pub const TUPLE2       : u8 = b'\x86'; // build 2-tuple from two topmost stack items
// pub const TUPLE3       : u8 = b'\x87'; // build 3-tuple from three topmost stack items
// pub const LONG1        : u8 = b'\x8a'; // push long from < 256 bytes
// pub const LONG4        : u8 = b'\x8b'; // push really big long
