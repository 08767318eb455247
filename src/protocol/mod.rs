/*!
 * Object store protocols
 *
 * S3 is the only store the transport speaks today.
 */

pub mod s3;
