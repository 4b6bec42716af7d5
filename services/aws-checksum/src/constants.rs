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

/// Names the checksum header sent as a trailer.
pub const X_AMZ_TRAILER: &str = "x-amz-trailer";
/// Length of the body before aws-chunked framing.
pub const X_AMZ_DECODED_CONTENT_LENGTH: &str = "x-amz-decoded-content-length";

/// Value appended to `Content-Encoding` once the body is aws-chunked framed.
pub const AWS_CHUNKED: &str = "aws-chunked";

/// Payload hash signed in place of the real digest when the checksum
/// travels in a trailer.
pub const STREAMING_UNSIGNED_PAYLOAD_TRAILER: &str = "STREAMING-UNSIGNED-PAYLOAD-TRAILER";

/// Operation input value that turns response validation on.
pub const VALIDATION_MODE_ENABLED: &str = "ENABLED";

/// Env value read by [`Config::from_env`](crate::Config::from_env).
pub const AWS_REQUEST_CHECKSUM_CALCULATION: &str = "AWS_REQUEST_CHECKSUM_CALCULATION";
/// Env value read by [`Config::from_env`](crate::Config::from_env).
pub const AWS_RESPONSE_CHECKSUM_VALIDATION: &str = "AWS_RESPONSE_CHECKSUM_VALIDATION";

/// Size of every data chunk but the last in an aws-chunked body.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Buffer size used while hashing a seekable body.
pub const READ_BUFFER_SIZE: usize = 32 * 1024;
