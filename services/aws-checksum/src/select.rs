// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Pick the checksum algorithm of a request and decide whether a response
//! is validated.

use log::debug;
use reqsign_core::Result;

use crate::constants::VALIDATION_MODE_ENABLED;
use crate::{Algorithm, RequestChecksumCalculation, ResponseChecksumValidation};

/// Algorithm used when a checksum is needed but none was picked.
pub const DEFAULT_ALGORITHM: Algorithm = Algorithm::Crc32;

/// Select the algorithm for an outbound request.
///
/// - `explicit` is the per-call algorithm field of the operation input.
/// - `mode` is the client-wide calculation mode.
/// - `required` tells whether the operation requires a checksum.
///
/// Returns `Ok(None)` when no checksum is attached.
pub fn select_request_algorithm(
    explicit: Option<&str>,
    mode: RequestChecksumCalculation,
    required: bool,
) -> Result<Option<Algorithm>> {
    if let Some(v) = explicit.filter(|v| !v.is_empty()) {
        let algorithm = v.parse::<Algorithm>()?;
        debug!("request checksum algorithm {algorithm} picked by caller");
        return Ok(Some(algorithm));
    }

    let selected = match mode {
        RequestChecksumCalculation::WhenSupported => Some(DEFAULT_ALGORITHM),
        RequestChecksumCalculation::WhenRequired if required => Some(DEFAULT_ALGORITHM),
        RequestChecksumCalculation::WhenRequired => None,
    };
    debug!("request checksum algorithm {selected:?} selected by mode {mode}");
    Ok(selected)
}

/// Decide whether the response of an operation is validated.
///
/// `validation_mode` is the opaque validation-mode field of the operation
/// input. Only `ENABLED` turns validation on, any other value is ignored.
pub fn response_validation_enabled(
    mode: ResponseChecksumValidation,
    validation_mode: Option<&str>,
) -> bool {
    match mode {
        ResponseChecksumValidation::WhenSupported => true,
        ResponseChecksumValidation::WhenRequired => validation_mode
            .is_some_and(|v| v.eq_ignore_ascii_case(VALIDATION_MODE_ENABLED)),
    }
}
