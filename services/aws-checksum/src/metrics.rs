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

use http::HeaderMap;
use log::debug;

use crate::{Algorithm, Attempt, RequestChecksumCalculation, ResponseChecksumValidation};

impl Algorithm {
    /// Feature id recorded when the caller sets this checksum.
    pub fn feature_id(&self) -> &'static str {
        match self {
            Algorithm::Crc32 => "U",
            Algorithm::Crc32c => "V",
            Algorithm::Crc64Nvme => "W",
            Algorithm::Sha1 => "X",
            Algorithm::Sha256 => "Y",
        }
    }
}

impl RequestChecksumCalculation {
    /// Feature id of the calculation mode.
    pub fn feature_id(&self) -> &'static str {
        match self {
            Self::WhenSupported => "Z",
            Self::WhenRequired => "a",
        }
    }
}

impl ResponseChecksumValidation {
    /// Feature id of the validation mode.
    pub fn feature_id(&self) -> &'static str {
        match self {
            Self::WhenSupported => "b",
            Self::WhenRequired => "c",
        }
    }
}

/// Build stage recording which request checksum features are in use.
///
/// Runs before [`ComputeInputChecksum`](crate::ComputeInputChecksum) so only
/// checksums set by the caller are recorded.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestChecksumMetricsTracking {
    calculation: RequestChecksumCalculation,
}

impl RequestChecksumMetricsTracking {
    /// Create a new stage for the given calculation mode.
    pub fn new(calculation: RequestChecksumCalculation) -> Self {
        Self { calculation }
    }

    /// Run the stage.
    pub fn handle_build(&self, headers: &HeaderMap, attempt: &mut Attempt) {
        attempt.record_feature(self.calculation.feature_id());
        for algorithm in Algorithm::ALL {
            if headers.contains_key(algorithm.header_name()) {
                debug!("request checksum {algorithm} set by caller");
                attempt.record_feature(algorithm.feature_id());
            }
        }
    }
}

/// Build stage recording the response checksum validation mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseChecksumMetricsTracking {
    validation: ResponseChecksumValidation,
}

impl ResponseChecksumMetricsTracking {
    /// Create a new stage for the given validation mode.
    pub fn new(validation: ResponseChecksumValidation) -> Self {
        Self { validation }
    }

    /// Run the stage.
    pub fn handle_build(&self, attempt: &mut Attempt) {
        attempt.record_feature(self.validation.feature_id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(RequestChecksumCalculation::WhenSupported, &[], &["Z"]; "default")]
    #[test_case(RequestChecksumCalculation::WhenRequired, &[], &["a"]; "when required")]
    #[test_case(RequestChecksumCalculation::WhenSupported, &["x-amz-checksum-crc32"], &["U", "Z"]; "default with crc32")]
    #[test_case(RequestChecksumCalculation::WhenRequired, &["x-amz-checksum-sha256"], &["Y", "a"]; "when required with sha256")]
    #[test_case(RequestChecksumCalculation::WhenSupported, &["x-amz-checksum-crc32c", "x-amz-checksum-crc64nvme"], &["V", "W", "Z"]; "default with crc32c and crc64nvme")]
    #[test_case(RequestChecksumCalculation::WhenSupported, &["x-amz-checksum-sha1"], &["X", "Z"]; "default with sha1")]
    fn test_request_checksum_metrics_tracking(
        calculation: RequestChecksumCalculation,
        preset: &[&'static str],
        expected: &[&str],
    ) {
        let mut headers = HeaderMap::new();
        for name in preset {
            headers.insert(*name, HeaderValue::from_static("aa"));
        }
        let mut attempt = Attempt::new();

        RequestChecksumMetricsTracking::new(calculation).handle_build(&headers, &mut attempt);

        assert_eq!(attempt.features(), expected);
    }

    #[test_case(ResponseChecksumValidation::WhenSupported, "b"; "default")]
    #[test_case(ResponseChecksumValidation::WhenRequired, "c"; "when required")]
    fn test_response_checksum_metrics_tracking(
        validation: ResponseChecksumValidation,
        expected: &str,
    ) {
        let mut attempt = Attempt::new();

        ResponseChecksumMetricsTracking::new(validation).handle_build(&mut attempt);

        assert_eq!(attempt.features(), &[expected]);
    }
}
