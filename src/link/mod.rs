// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Link to the recorder: state machine, serializer and reader loop.

mod error;
mod machine;
mod service;

pub use error::LinkError;
pub use machine::{Effect, LinkMachine, LinkState};
pub use service::{Command, LinkHandle, LinkService, LinkSettings};
