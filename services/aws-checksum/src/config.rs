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

use std::fmt;
use std::str::FromStr;

use reqsign_core::{Context, Error, Result};

use crate::constants::*;

/// When request checksums are calculated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestChecksumCalculation {
    /// Calculate a checksum for every operation that supports one.
    #[default]
    WhenSupported,
    /// Calculate a checksum only when the operation requires one or the
    /// caller picked an algorithm.
    WhenRequired,
}

/// When response checksums are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseChecksumValidation {
    /// Validate every response that carries a supported checksum.
    #[default]
    WhenSupported,
    /// Validate only when the operation input asks for it.
    WhenRequired,
}

fn parse_mode(key: &str, s: &str) -> Result<bool> {
    if s.eq_ignore_ascii_case("when_supported") {
        Ok(true)
    } else if s.eq_ignore_ascii_case("when_required") {
        Ok(false)
    } else {
        Err(Error::config_invalid(format!(
            "invalid value for {key}: {s}, expected when_supported or when_required"
        )))
    }
}

impl FromStr for RequestChecksumCalculation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match parse_mode(AWS_REQUEST_CHECKSUM_CALCULATION, s)? {
            true => Self::WhenSupported,
            false => Self::WhenRequired,
        })
    }
}

impl FromStr for ResponseChecksumValidation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match parse_mode(AWS_RESPONSE_CHECKSUM_VALIDATION, s)? {
            true => Self::WhenSupported,
            false => Self::WhenRequired,
        })
    }
}

impl fmt::Display for RequestChecksumCalculation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WhenSupported => f.write_str("when_supported"),
            Self::WhenRequired => f.write_str("when_required"),
        }
    }
}

impl fmt::Display for ResponseChecksumValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WhenSupported => f.write_str("when_supported"),
            Self::WhenRequired => f.write_str("when_required"),
        }
    }
}

/// Config carries the client-wide checksum settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// `request_checksum_calculation` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AWS_REQUEST_CHECKSUM_CALCULATION`]
    /// - `when_supported` otherwise
    pub request_checksum_calculation: Option<RequestChecksumCalculation>,
    /// `response_checksum_validation` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AWS_RESPONSE_CHECKSUM_VALIDATION`]
    /// - `when_supported` otherwise
    pub response_checksum_validation: Option<ResponseChecksumValidation>,
}

impl Config {
    /// Create a new Config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set request_checksum_calculation
    pub fn with_request_checksum_calculation(mut self, v: RequestChecksumCalculation) -> Self {
        self.request_checksum_calculation = Some(v);
        self
    }

    /// Set response_checksum_validation
    pub fn with_response_checksum_validation(mut self, v: ResponseChecksumValidation) -> Self {
        self.response_checksum_validation = Some(v);
        self
    }

    /// Load config from env.
    ///
    /// Values already set are kept. An env value that is neither
    /// `when_supported` nor `when_required` is an error.
    pub fn from_env(mut self, ctx: &Context) -> Result<Self> {
        if self.request_checksum_calculation.is_none() {
            if let Some(v) = ctx.env_var(AWS_REQUEST_CHECKSUM_CALCULATION) {
                self.request_checksum_calculation = Some(v.parse()?);
            }
        }
        if self.response_checksum_validation.is_none() {
            if let Some(v) = ctx.env_var(AWS_RESPONSE_CHECKSUM_VALIDATION) {
                self.response_checksum_validation = Some(v.parse()?);
            }
        }

        Ok(self)
    }

    /// The effective request checksum calculation mode.
    pub fn request_checksum_calculation(&self) -> RequestChecksumCalculation {
        self.request_checksum_calculation.unwrap_or_default()
    }

    /// The effective response checksum validation mode.
    pub fn response_checksum_validation(&self) -> ResponseChecksumValidation {
        self.response_checksum_validation.unwrap_or_default()
    }
}
