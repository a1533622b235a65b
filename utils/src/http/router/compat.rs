use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;

/// Adapts a hyper body into a `Stream` of its data frames. Trailer frames are
/// skipped.
#[pin_project::pin_project]
pub struct BodyStream<B>(#[pin] B);

impl<B: hyper::body::Body<Data = Bytes>> futures_util::Stream for BodyStream<B> {
	type Item = Result<Bytes, B::Error>;

	fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		let mut this = self.project();
		loop {
			return match this.0.as_mut().poll_frame(cx) {
				Poll::Ready(Some(Ok(frame))) => match frame.into_data() {
					Ok(data) => Poll::Ready(Some(Ok(data))),
					Err(_) => continue,
				},
				Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(err))),
				Poll::Ready(None) => Poll::Ready(None),
				Poll::Pending => Poll::Pending,
			};
		}
	}
}

pub trait BodyExt: hyper::body::Body + Sized {
	fn into_stream(self) -> BodyStream<Self>;
}

impl<B: hyper::body::Body<Data = Bytes>> BodyExt for B {
	fn into_stream(self) -> BodyStream<Self> {
		BodyStream(self)
	}
}
